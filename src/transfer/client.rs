use std::net::SocketAddr;
use std::sync::Arc;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::TransferResult;
use crate::net::exchange::Exchanger;
use crate::net::transport::{DatagramTransport, UdpTransport};
use crate::transfer::download_list::validate_name;
use crate::transfer::negotiate::negotiate;
use crate::transfer::observer::TransferObserver;
use crate::transfer::session::TransferSession;

/// Downloads single files from one server, one at a time. All exchanges (control and data) share
///  a single local socket.
pub struct FileClient {
    config: Arc<ClientConfig>,
    control_endpoint: SocketAddr,
    exchanger: Exchanger,
    observer: Arc<dyn TransferObserver>,
}

impl FileClient {
    /// Resolves the server and binds a local socket. Nothing is sent yet.
    pub async fn connect(config: Arc<ClientConfig>, observer: Arc<dyn TransferObserver>) -> anyhow::Result<FileClient> {
        config.validate()?;

        let control_endpoint = config.resolve_control_endpoint().await?;
        let transport = UdpTransport::bind_for(control_endpoint, config.receive_buffer_len()).await?;
        info!("bound to {:?}, server control endpoint is {:?}", transport.local_addr()?, control_endpoint);

        Ok(Self::new(config, control_endpoint, Arc::new(transport), observer))
    }

    pub fn new(
        config: Arc<ClientConfig>,
        control_endpoint: SocketAddr,
        transport: Arc<dyn DatagramTransport>,
        observer: Arc<dyn TransferObserver>,
    ) -> FileClient {
        let exchanger = Exchanger::from_config(transport, &config);
        FileClient {
            config,
            control_endpoint,
            exchanger,
            observer,
        }
    }

    /// Downloads `name` into the output directory, returning the file's size. The local file is
    ///  created (or truncated) only after the server agreed to serve it; on failure it keeps all
    ///  chunks written so far.
    pub async fn fetch(&self, name: &str) -> TransferResult<u64> {
        validate_name(name)?;

        let metadata = negotiate(&self.exchanger, self.control_endpoint, name).await?;

        let mut session = TransferSession::new(
            &self.exchanger,
            self.observer.as_ref(),
            name,
            metadata.data_endpoint,
            metadata.size,
            self.config.chunk_size,
        );

        let path = self.config.output_dir.join(name);
        let open_result = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await;
        let mut file = match open_result {
            Ok(file) => file,
            Err(e) => {
                warn!(?path, "cannot open output file: {}", e);
                // the data session exists on the server from here on
                if let Err(close_error) = session.close().await {
                    debug!(name, "closing abandoned session failed: {}", close_error);
                }
                return Err(e.into());
            }
        };
        debug!(?path, size = metadata.size, "opened output file");

        self.observer.on_file_started(name, metadata.size);

        let result = session.download(&mut file).await;

        let flushed = file.flush().await;
        if let Err(e) = &flushed {
            warn!(?path, "error flushing output file: {}", e);
        }

        result?;
        flushed?;
        Ok(metadata.size)
    }
}
