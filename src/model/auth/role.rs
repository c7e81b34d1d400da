use std::fmt::Display;

use serde_repr::{Deserialize_repr, Serialize_repr};

/// The two privilege levels of the system.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Role {
    /// A registered voter.
    Voter = 0,
    /// The Election Commission, the sole administrator.
    Ec = 1,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Ec => "ec",
        }
    }

    /// Reason given when a request needs this role but has the other one.
    pub fn requirement(self) -> &'static str {
        match self {
            Self::Voter => "Voters only",
            Self::Ec => "EC only",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}
