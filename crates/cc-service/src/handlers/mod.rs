//! HTTP request handlers for Call Controller.

pub mod calls;
pub mod health;
pub mod notifications;

pub use calls::accept_call;
pub use health::{health_check, metrics_handler, readiness_check};
pub use notifications::send_ringing_notification;
