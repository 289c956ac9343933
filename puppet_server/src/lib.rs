//! `puppet_server`
//!
//! Transport listeners and the tick-loop consumer of the remote-control
//! pipeline. Every listener pushes normalized commands into the shared
//! queue; only the tick loop in [`ctl`] touches merge state.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::warn;

pub mod ctl;
pub mod http;
pub mod socket;
pub mod store;

/// Binds a listener, falling back to loopback on the same port when the
/// configured address is unavailable. A transport that fails both binds is
/// reported to the operator and skipped; the service keeps running.
pub async fn bind_or_loopback(addr: &str, transport: &str) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("parse {transport} addr {addr:?}"))?;
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            warn!(%addr, transport, error = %e, "bind failed, retrying on loopback");
            let fallback = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port());
            TcpListener::bind(fallback)
                .await
                .with_context(|| format!("{transport} fallback bind on {fallback}"))
        }
    }
}
