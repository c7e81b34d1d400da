use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A Shangri-La Citizen Code. Each code enrols at most one voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scc {
    /// The code itself doubles as the document ID.
    #[serde(rename = "_id")]
    pub code: String,
    /// The voter who registered with this code, if any.
    pub used_by: Option<Id>,
}
