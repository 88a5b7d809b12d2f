//! Document storage for edgekit
//!
//! - `mongo`: one MongoDB collection with per-operation timeouts

pub mod error;
pub mod mongo;

pub use error::{Result, StoreError};
pub use mongo::MongoStore;
pub use mongodb::bson::{doc, Document};
pub use mongodb::results::{DeleteResult, InsertOneResult, UpdateResult};
