use std::sync::Arc;

use clap::Parser;

use cipherproxy::config::Args;
use cipherproxy::crypto::EncryptionContext;
use cipherproxy::proxy::ProxyServer;
use cipherproxy::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();
    log::info!("cipherproxy starting...");

    let args = Args::parse();

    let Some(upstream) = args.upstream_origin() else {
        log::error!("no upstream origin configured (--upstream or CIPHERPROXY_UPSTREAM)");
        std::process::exit(1);
    };

    let state = Arc::new(AppState::new(&upstream));

    // Boot-time configuration, equivalent to POST /configure. An import
    // failure leaves the engine unconfigured rather than aborting: the
    // runtime configuration channel can still succeed later.
    if let Some((counter_b64, key_b64)) = args.boot_key_material() {
        match EncryptionContext::from_base64url(&counter_b64, &key_b64) {
            Ok(context) => {
                // Cannot already be configured this early.
                let _ = state.configure(context);
                log::info!("encryption context configured at boot");
            }
            Err(e) => log::error!("boot-time key import failed: {}", e),
        }
    }

    let server = ProxyServer::new(args.listen, Arc::clone(&state));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                log::error!("server error: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown signal received");
        }
    }
}
