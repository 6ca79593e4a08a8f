mod udp;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use futures::FutureExt;
use tokio::{net::UdpSocket, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::dns_mw::DnsMiddlewareHandler;
use crate::log::debug;

/// Binds `addr` and answers every datagram through `handler` until shut down.
pub async fn serve(addr: SocketAddr, handler: Arc<DnsMiddlewareHandler>) -> anyhow::Result<ServerHandle> {
    let socket = UdpSocket::bind(addr)
        .await
        .with_context(|| format!("failed to bind UDP {}", addr))?;

    let local_addr = socket.local_addr()?;
    debug!("bound UDP {}", local_addr);

    Ok(ServerHandle {
        local_addr,
        token: udp::serve(socket, handler),
    })
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
}

impl ServerHandle {
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn shutdown(self) {
        self.token.cancel()
    }
}

pub fn reap_tasks(join_set: &mut JoinSet<()>) {
    while FutureExt::now_or_never(join_set.join_next())
        .flatten()
        .is_some()
    {}
}

/// Checks if the IP address is safe for returning messages
///
/// Examples of unsafe addresses are any with a port of `0`
fn sanitize_src_address(src: SocketAddr) -> Result<(), String> {
    if src.port() == 0 {
        return Err(format!("cannot respond to src on port 0: {src}"));
    }

    fn verify_v4(src: Ipv4Addr) -> Result<(), String> {
        if src.is_unspecified() {
            return Err(format!("cannot respond to unspecified v4 addr: {src}"));
        }

        if src.is_broadcast() {
            return Err(format!("cannot respond to broadcast v4 addr: {src}"));
        }

        Ok(())
    }

    fn verify_v6(src: Ipv6Addr) -> Result<(), String> {
        if src.is_unspecified() {
            return Err(format!("cannot respond to unspecified v6 addr: {src}"));
        }

        Ok(())
    }

    match src.ip() {
        IpAddr::V4(v4) => verify_v4(v4),
        IpAddr::V6(v6) => verify_v6(v6),
    }
}
