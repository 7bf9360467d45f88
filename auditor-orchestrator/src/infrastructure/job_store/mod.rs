//! Job persistence

mod memory;
mod postgres;
mod store;

pub use memory::InMemoryJobStore;
pub use postgres::PostgresJobStore;
pub use store::{JobStore, JobStoreError};
