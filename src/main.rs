use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chunkfetch::config::ClientConfig;
use chunkfetch::transfer::observer::ConsoleObserver;
use chunkfetch::transfer::sequencer::run_from_list;
use clap::Parser;
use clap_derive::Parser;
use tracing::{error, Level};

/// Downloads the files named in a download list from a chunked UDP file server
#[derive(Parser)]
struct Args {
    server_host: String,
    control_port: u16,
    download_list: PathBuf,

    #[clap(long, default_value = ".")]
    output_dir: PathBuf,

    #[clap(long, default_value_t = 1024)]
    buffer_size: usize,

    #[clap(long, default_value_t = 1000)]
    chunk_size: u64,

    #[clap(long, default_value_t = 5)]
    max_attempts: u32,

    #[clap(long, default_value_t = 1000)]
    initial_timeout_ms: u64,

    #[clap(short, long, default_value_t = false)]
    verbose: bool,

    #[clap(long, default_value_t = false)]
    very_verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let level = match (args.verbose, args.very_verbose) {
        (_, true) => Level::TRACE,
        (true, _) => Level::DEBUG,
        (false, false) => Level::WARN,
    };

    // stdout is reserved for progress output
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let mut config = ClientConfig::new(args.server_host, args.control_port, args.download_list);
    config.output_dir = args.output_dir;
    config.buffer_size = args.buffer_size;
    config.chunk_size = args.chunk_size;
    config.max_attempts = args.max_attempts;
    config.initial_timeout = Duration::from_millis(args.initial_timeout_ms);

    let summary = run_from_list(config, Arc::new(ConsoleObserver::stdout())).await?;

    if summary.is_success() {
        println!("{} file(s) downloaded", summary.completed.len());
        Ok(ExitCode::SUCCESS)
    }
    else {
        for (name, e) in &summary.failed {
            error!("{}: {}", name, e);
        }
        println!("{} file(s) downloaded, {} failed", summary.completed.len(), summary.failed.len());
        Ok(ExitCode::FAILURE)
    }
}
