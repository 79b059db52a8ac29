use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{anyhow, bail};
use tokio::net::lookup_host;

/// Incoming datagrams may be this many times bigger than the configured buffer size
pub const RECEIVE_BUFFER_FACTOR: usize = 10;

/// Room for the `FILE <name> OK START <s> END <e> DATA ` prefix of a chunk reply. Names are not
///  part of this, they are added separately.
const CHUNK_REPLY_OVERHEAD: usize = 64;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_host: String,
    /// well-known port for `DOWNLOAD` requests. Data ports are assigned per file by the server.
    pub control_port: u16,

    /// newline separated list of file names, blank lines are ignored
    pub download_list: PathBuf,
    pub output_dir: PathBuf,

    pub buffer_size: usize,
    /// number of bytes requested per `GET`. The server may return more or less than that.
    pub chunk_size: u64,

    /// total number of times a request is sent before the exchange gives up
    pub max_attempts: u32,
    /// timeout for the first attempt of each exchange, doubled for every further attempt
    pub initial_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server_host: impl Into<String>, control_port: u16, download_list: impl Into<PathBuf>) -> ClientConfig {
        ClientConfig {
            server_host: server_host.into(),
            control_port,
            download_list: download_list.into(),
            output_dir: PathBuf::from("."),
            buffer_size: 1024,
            chunk_size: 1000,
            max_attempts: 5,
            initial_timeout: Duration::from_secs(1),
        }
    }

    pub fn receive_buffer_len(&self) -> usize {
        self.buffer_size * RECEIVE_BUFFER_FACTOR
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_host.trim().is_empty() {
            bail!("server host is empty");
        }
        if self.control_port == 0 {
            bail!("control port must not be 0");
        }
        if self.buffer_size == 0 {
            bail!("buffer size must be positive");
        }
        if self.chunk_size == 0 {
            bail!("chunk size must be positive");
        }
        if self.max_attempts == 0 {
            bail!("at least one attempt per request is required");
        }
        if self.initial_timeout.is_zero() {
            bail!("initial timeout must be positive");
        }

        let encoded_chunk_len = (self.chunk_size as usize).div_ceil(3) * 4;
        if encoded_chunk_len + CHUNK_REPLY_OVERHEAD > self.receive_buffer_len() {
            bail!("chunk size {} does not fit into a receive buffer of {} bytes", self.chunk_size, self.receive_buffer_len());
        }

        Ok(())
    }

    pub async fn resolve_control_endpoint(&self) -> anyhow::Result<SocketAddr> {
        lookup_host((self.server_host.as_str(), self.control_port)).await?
            .next()
            .ok_or_else(|| anyhow!("could not resolve server host {:?}", self.server_host))
    }
}

/// The data endpoint for a file lives on the same host as the control endpoint
pub fn data_endpoint(control_endpoint: SocketAddr, port: u16) -> SocketAddr {
    SocketAddr::new(control_endpoint.ip(), port)
}
