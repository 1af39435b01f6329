pub mod db;
pub mod models;
pub mod store;

pub use db::{Database, DatabaseError};
pub use store::{Entity, EntityCounts, FleetState, StateStore};
