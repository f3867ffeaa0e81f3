//! Shared infrastructure for the OAuth login service.

pub mod config;
pub mod error;
pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod oauth;
pub mod random;
pub mod rejection;
pub mod signed;
pub mod time;
