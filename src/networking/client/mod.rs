//! HTTP client and session
pub mod blocking;
