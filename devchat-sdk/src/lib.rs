//! Client SDK for the text-completion service used by devchat.
//!
//! The CLI depends on this crate only through the [`CompletionClient`]
//! trait, so the real HTTP client can be swapped for a deterministic
//! stand-in in tests.

pub mod api;
pub mod client;
pub mod error;
pub mod message;

pub use client::{CompletionClient, OpenAiClient, RetryPolicy};
pub use error::CompletionError;
pub use message::{ChatMessage, CompletionRequest, Role};

// Re-export for downstream trait implementations (stub clients in tests).
pub use async_trait::async_trait;
