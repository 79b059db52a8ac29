use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, error, trace, warn};

use crate::config::ClientConfig;
use crate::error::{TransferError, TransferResult};
use crate::net::backoff::ExponentialBackoff;
use crate::net::transport::DatagramTransport;
use crate::protocol::request::Request;

/// Stop-and-wait request / response over an unreliable transport: the request is sent, and the
///  first datagram that arrives within the current timeout is taken as its reply. If nothing
///  arrives, the identical request is sent again with twice the timeout, until the configured
///  number of attempts is used up.
///
/// There is no request id in the protocol, so callers must never have more than one exchange in
///  flight. The sender of a reply is not verified.
pub struct Exchanger {
    transport: Arc<dyn DatagramTransport>,
    initial_timeout: Duration,
    max_attempts: u32,
}

impl Exchanger {
    pub fn new(transport: Arc<dyn DatagramTransport>, initial_timeout: Duration, max_attempts: u32) -> Exchanger {
        Exchanger {
            transport,
            initial_timeout,
            max_attempts,
        }
    }

    pub fn from_config(transport: Arc<dyn DatagramTransport>, config: &ClientConfig) -> Exchanger {
        Self::new(transport, config.initial_timeout, config.max_attempts)
    }

    /// Returns the reply's text (invalid UTF-8 replaced), or [TransferError::Timeout] if no
    ///  attempt got a reply.
    pub async fn exchange(&self, request: &Request, to: SocketAddr) -> TransferResult<String> {
        let wire = request.to_wire();

        let num_stale = self.transport.discard_pending();
        if num_stale > 0 {
            debug!(num_stale, "discarded datagrams that arrived before sending {:?}", wire);
        }

        let mut backoff = ExponentialBackoff::new(self.initial_timeout, self.max_attempts);
        while let Some(wait) = backoff.next_timeout() {
            let attempt = backoff.attempts();
            let deadline = Instant::now() + wait;
            trace!(attempt, ?wait, ?to, name = request.name(), "sending {:?}", wire);

            if let Err(e) = self.transport.send_to(to, wire.as_bytes()).await {
                error!("error sending request to {:?}: {}", to, e);
            }

            match timeout_at(deadline, self.transport.recv_from()).await {
                Ok(Ok((buf, from))) => {
                    if from != to {
                        debug!(?from, ?to, "reply from an unexpected sender, accepting it anyway");
                    }
                    return Ok(String::from_utf8_lossy(&buf).into_owned());
                }
                Ok(Err(e)) => {
                    warn!(attempt, "error receiving reply to {:?}: {}", wire, e);
                    // a failed receive uses up the attempt's full wait, not less
                    sleep_until(deadline).await;
                }
                Err(_) => {
                    warn!(attempt, max_attempts = self.max_attempts, "no reply to {:?} within {:?}", wire, wait);
                }
            }
        }

        Err(TransferError::Timeout {
            to,
            attempts: backoff.attempts(),
        })
    }
}
