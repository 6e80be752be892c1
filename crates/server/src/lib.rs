//! HTTP shim in front of the media dispatcher.
//!
//! A chat transport adapter posts attachments and links here and relays the
//! returned artifact (or rejection text) back to the conversation.

pub mod api;
pub mod metrics;
pub mod state;
