//! Service layer for Call Controller.
//!
//! This module contains clients for external systems.
//!
//! # Components
//!
//! - `push_client` - Push delivery via the FCM HTTP v1 API

pub mod push_client;

pub use push_client::{FcmClient, PushClient};
// Mock push client for testing (exposed for integration tests and the
// test-utils harness)
#[allow(unused_imports)]
pub use push_client::mock::MockPushClient;
