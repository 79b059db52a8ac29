use std::io::Write;
use std::sync::Mutex;
#[cfg(test)] use mockall::automock;

use crate::error::TransferError;

/// Progress notifications for the operator. Called from the single task that drives the
///  transfer, in protocol order.
#[cfg_attr(test, automock)]
pub trait TransferObserver: Send + Sync {
    /// metadata was negotiated and the output file is open
    fn on_file_started(&self, name: &str, size: u64);

    /// called exactly once per chunk that was decoded and written
    fn on_chunk_written(&self, name: &str, downloaded: u64, size: u64);

    fn on_file_completed(&self, name: &str, size: u64);

    fn on_file_failed(&self, name: &str, error: &TransferError);
}

/// Prints one `*` per written chunk and a result line per file
pub struct ConsoleObserver<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleObserver<std::io::Stdout> {
    pub fn stdout() -> Self {
        ConsoleObserver::new(std::io::stdout())
    }
}

impl <W: Write + Send> ConsoleObserver<W> {
    pub fn new(out: W) -> Self {
        ConsoleObserver {
            out: Mutex::new(out),
        }
    }

    fn print(&self, text: &str) {
        // progress output is best effort, a closed stdout must not abort a transfer
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap()
    }
}

impl <W: Write + Send> TransferObserver for ConsoleObserver<W> {
    fn on_file_started(&self, name: &str, size: u64) {
        self.print(&format!("{} ({} bytes) ", name, size));
    }

    fn on_chunk_written(&self, _name: &str, _downloaded: u64, _size: u64) {
        self.print("*");
    }

    fn on_file_completed(&self, _name: &str, _size: u64) {
        self.print(" done\n");
    }

    fn on_file_failed(&self, name: &str, error: &TransferError) {
        self.print(&format!("\n{}: FAILED - {}\n", name, error));
    }
}
