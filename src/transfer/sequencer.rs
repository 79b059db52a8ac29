use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{TransferError, TransferResult};
use crate::transfer::client::FileClient;
use crate::transfer::download_list::load_download_list;
use crate::transfer::observer::TransferObserver;

/// Downloads a single file, returning its size
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, name: &str) -> TransferResult<u64>;
}

#[async_trait]
impl FileFetcher for FileClient {
    async fn fetch(&self, name: &str) -> TransferResult<u64> {
        FileClient::fetch(self, name).await
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<(String, u64)>,
    pub failed: Vec<(String, TransferError)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetches the files one after the other, in list order. A failed file is reported and the run
///  continues with the next one.
pub async fn run_batch(fetcher: &dyn FileFetcher, observer: &dyn TransferObserver, names: &[String]) -> RunSummary {
    let mut summary = RunSummary::default();

    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        match fetcher.fetch(name).await {
            Ok(size) => {
                info!(name, size, "download complete");
                observer.on_file_completed(name, size);
                summary.completed.push((name.to_string(), size));
            }
            Err(e) => {
                warn!(name, "download failed: {}", e);
                observer.on_file_failed(name, &e);
                summary.failed.push((name.to_string(), e));
            }
        }
    }

    info!(completed = summary.completed.len(), failed = summary.failed.len(), "all downloads finished");
    summary
}

/// Downloads everything on the configured download list. Configuration problems (invalid
///  settings, unreadable or empty list, unresolvable host) are reported as errors before anything
///  is sent.
pub async fn run_from_list(config: ClientConfig, observer: Arc<dyn TransferObserver>) -> anyhow::Result<RunSummary> {
    config.validate()?;
    let names = load_download_list(&config.download_list).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    info!("downloading {} file(s) from {}:{}", names.len(), config.server_host, config.control_port);
    let client = FileClient::connect(Arc::new(config), observer.clone()).await?;
    Ok(run_batch(&client, observer.as_ref(), &names).await)
}
