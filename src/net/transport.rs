use std::io::ErrorKind;
use std::net::SocketAddr;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::net::UdpSocket;
use tracing::{debug, trace};

/// Unreliable, unordered datagram delivery - the only thing the exchange layer needs from the
///  network
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    async fn send_to(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()>;

    /// Waits for the next datagram from any sender. Cancel safe: dropping the returned future
    ///  before completion loses no datagram.
    async fn recv_from(&self) -> anyhow::Result<(Bytes, SocketAddr)>;

    /// Drops all datagrams that are already queued without waiting for more, returning the
    ///  number of dropped datagrams
    fn discard_pending(&self) -> usize;
}

pub struct UdpTransport {
    socket: UdpSocket,
    receive_buffer_len: usize,
}
impl UdpTransport {
    /// Binds an ephemeral port in the address family of `peer`
    pub async fn bind_for(peer: SocketAddr, receive_buffer_len: usize) -> anyhow::Result<UdpTransport> {
        let bind_addr = if peer.is_ipv4() {
            SocketAddr::from_str("0.0.0.0:0")?
        }
        else {
            SocketAddr::from_str("[::]:0")?
        };

        Ok(UdpTransport {
            socket: UdpSocket::bind(bind_addr).await?,
            receive_buffer_len,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()> {
        trace!(?to, len = buf.len(), "sending datagram");
        self.socket.send_to(buf, to).await?;
        Ok(())
    }

    async fn recv_from(&self) -> anyhow::Result<(Bytes, SocketAddr)> {
        let mut buf = BytesMut::zeroed(self.receive_buffer_len);
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        trace!(?from, len, "received datagram");
        buf.truncate(len);
        Ok((buf.freeze(), from))
    }

    fn discard_pending(&self) -> usize {
        let mut buf = [0u8; 64];
        let mut num_discarded = 0;
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((_, from)) => {
                    trace!(?from, "discarding stale datagram");
                    num_discarded += 1;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("error draining socket: {}", e);
                    break;
                }
            }
        }
        num_discarded
    }
}
