//! CLI arguments with environment fallbacks.

use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "cipherproxy")]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Upstream object-store origin, e.g. https://dl.example.com
    #[arg(long)]
    pub upstream: Option<String>,

    /// base64url-encoded 16-byte CTR start counter (boot-time configuration)
    #[arg(long)]
    pub start_counter: Option<String>,

    /// base64url-encoded 32-byte AES key (boot-time configuration)
    #[arg(long)]
    pub key: Option<String>,
}

impl Args {
    /// Upstream origin: `--upstream` > `CIPHERPROXY_UPSTREAM`.
    pub fn upstream_origin(&self) -> Option<String> {
        self.upstream
            .clone()
            .or_else(|| std::env::var("CIPHERPROXY_UPSTREAM").ok())
    }

    /// Boot-time key material: flags > `CIPHERPROXY_START_COUNTER` /
    /// `CIPHERPROXY_KEY`. Both parts or nothing.
    pub fn boot_key_material(&self) -> Option<(String, String)> {
        let counter = self
            .start_counter
            .clone()
            .or_else(|| std::env::var("CIPHERPROXY_START_COUNTER").ok())?;
        let key = self
            .key
            .clone()
            .or_else(|| std::env::var("CIPHERPROXY_KEY").ok())?;
        Some((counter, key))
    }
}
