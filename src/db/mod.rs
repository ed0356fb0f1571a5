//! Persistence: the entity store contract and its adapters

mod pool;
mod postgres;
mod store;

#[cfg(test)]
pub mod memory;

pub use pool::{create_pool, run_migrations};
pub use postgres::PgStore;
pub use store::{ApprovalOutcome, EntityStore, SettlementOutcome, StoreError};
