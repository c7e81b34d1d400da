//! Types shared between the database and API representations.

pub mod referendum;
pub mod tally;
