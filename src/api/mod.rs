//! External analysis API.
//!
//! - `client`: submits texts and files, reshapes responses into payloads
//! - `token_cache`: per-user access tokens for authenticated requests

pub mod client;
pub mod token_cache;

pub use client::{split_texts, AnalysisClient, ApiError, ClientConfig, SessionAuth};
pub use token_cache::TokenCache;
