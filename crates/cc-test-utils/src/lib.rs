//! # CC Test Utilities
//!
//! Shared test utilities for the Call Controller (CC) service.
//!
//! This crate provides:
//! - Server test harness (`TestCcServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cc_service::repositories::MockCallStore;
//! use cc_service::services::MockPushClient;
//! use cc_test_utils::TestCcServer;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let store = Arc::new(MockCallStore::with_ringing_call("u1", "c1"));
//!     let push = Arc::new(MockPushClient::delivering());
//!     let server = TestCcServer::spawn(store, push).await?;
//!
//!     let response = reqwest::get(&format!("{}/health", server.url())).await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

// Re-export commonly used items
pub use server_harness::*;
