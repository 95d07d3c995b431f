//! Call record store access layer.
//!
//! # Components
//!
//! - `call_store` - The `CallStore` trait, its PostgreSQL implementation,
//!   and an in-memory mock for tests

pub mod call_store;

pub use call_store::{CallStore, PgCallStore};
// In-memory store for testing (exposed for integration tests and the
// test-utils harness)
#[allow(unused_imports)]
pub use call_store::mock::MockCallStore;
