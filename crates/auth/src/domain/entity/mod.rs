pub mod oauth;
pub mod user;
