//! Provider metadata discovery.

pub mod discovery;
