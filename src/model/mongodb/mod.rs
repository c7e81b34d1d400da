mod bson;
mod collection;
mod errors;
mod store;

pub use bson::Id;
pub use collection::{ensure_collections_exist, ensure_indexes_exist, Coll, MongoCollection};
pub use store::{MongoStore, MongoTransaction};
