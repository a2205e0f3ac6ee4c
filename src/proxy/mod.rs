//! Reverse-proxy surface: range parsing, request handling, accept loop.

pub mod range;
pub mod responder;
pub mod server;

pub use range::{range_start, RangeError};
pub use server::ProxyServer;
