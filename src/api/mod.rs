//! HTTP boundary to the MindHaven API server.

mod client;
mod error;

pub use client::{ApiClient, AuthTransport, LoginReply, TokenResponse, TokenStatus};
pub use error::ApiError;
