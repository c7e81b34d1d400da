//! Data types, their storage, and their API representations.

pub mod api;
pub mod auth;
pub mod common;
pub mod db;
pub mod mongodb;
pub mod store;
