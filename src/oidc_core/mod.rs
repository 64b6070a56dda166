//! OIDC client primitives, host seams and the delegate token manager.

pub mod config;
pub mod context;
pub mod http_client;
pub mod navigator;
pub mod response;
pub mod storage;
pub mod token_manager;
pub mod types;
