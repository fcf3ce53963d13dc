//! Chat-only client for the Q job service.
//!
//! Q answers requests asynchronously. A chat is submitted as a job to
//! `POST /v1/jobs`, polled at `GET /v1/jobs/{id}` until it settles, and
//! cancelled through `POST /v1/jobs/{id}/cancel` when the caller gives up.
//! Only the assistant text is returned; job metadata stays inside the client.

mod client;
mod config;
mod error;

pub use client::{ChatMessage, ChatOptions, QChat};
pub use config::QConfig;
pub use error::{QError, QResult};
