//! `stockroom-auth`: identity boundary.
//!
//! Identity itself is owned by a hosted provider. This crate only verifies the
//! provider's signed webhooks and describes the local user mirror it feeds.
//! Decoupled from HTTP and storage.

pub mod identity_event;
pub mod user;
pub mod webhook;

pub use identity_event::IdentityEvent;
pub use user::User;
pub use webhook::{WebhookError, WebhookHeaders, WebhookVerifier};
