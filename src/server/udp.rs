use std::net::SocketAddr;
use std::sync::Arc;

use tokio::{net::UdpSocket, task::JoinSet};
use tokio_util::sync::CancellationToken;

use super::{reap_tasks, sanitize_src_address};
use crate::dns::Message;
use crate::libdns::proto::error::ProtoError;
use crate::dns_mw::DnsMiddlewareHandler;
use crate::log;

/// Large enough for any EDNS payload a client may advertise.
const MAX_DATAGRAM: usize = 4096;

pub fn serve(socket: UdpSocket, handler: Arc<DnsMiddlewareHandler>) -> CancellationToken {
    let token = CancellationToken::new();
    let cancellation_token = token.clone();
    let socket = Arc::new(socket);

    tokio::spawn(async move {
        let mut inner_join_set = JoinSet::new();
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            let (len, src_addr) = tokio::select! {
                res = socket.recv_from(&mut buf) => match res {
                    Ok(res) => res,
                    Err(e) => {
                        log::warn!("error receiving message on udp_socket: {}", e);
                        continue;
                    }
                },
                _ = cancellation_token.cancelled() => break,
            };

            log::debug!("received udp request from: {}", src_addr);

            if let Err(e) = sanitize_src_address(src_addr) {
                log::warn!("address can not be responded to {}: {}", src_addr, e);
                continue;
            }

            let message = match Message::from_vec(&buf[..len]) {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("dropping malformed request from {}: {}", src_addr, e);
                    continue;
                }
            };

            let handler = handler.clone();
            let socket = socket.clone();

            inner_join_set.spawn(async move {
                if let Err(err) = handle(&socket, &handler, message, src_addr).await {
                    log::error!("UDP response to {} failed: {}", src_addr, err);
                }
            });

            reap_tasks(&mut inner_join_set);
        }

        inner_join_set.shutdown().await;
    });

    token
}

async fn handle(
    socket: &UdpSocket,
    handler: &DnsMiddlewareHandler,
    message: Message,
    src_addr: SocketAddr,
) -> anyhow::Result<()> {
    let max_payload = message.max_payload();

    let Some((res, err)) = handler.serve_message(message).await else {
        return Ok(());
    };

    if let Some(err) = err {
        log::debug!("{} answered with {}: {}", src_addr, res.response_code(), err);
    }

    let bytes = encode_reply(res.into_message(), max_payload)?;
    socket.send_to(&bytes, src_addr).await?;
    Ok(())
}

/// Encodes `message`, or a record-less copy with TC set when it would not fit
/// in `max_payload` bytes.
fn encode_reply(mut message: Message, max_payload: u16) -> Result<Vec<u8>, ProtoError> {
    let bytes = message.to_vec()?;
    if bytes.len() <= usize::from(max_payload) {
        return Ok(bytes);
    }

    log::debug!(
        "truncating reply {} of {} bytes to fit {}",
        message.id(),
        bytes.len(),
        max_payload
    );
    message.take_answers();
    message.take_name_servers();
    message.take_additionals();
    message.set_truncated(true);
    message.to_vec()
}
