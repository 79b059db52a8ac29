use std::net::SocketAddr;
use tracing::debug;

use crate::config::data_endpoint;
use crate::error::{TransferError, TransferResult};
use crate::net::exchange::Exchanger;
use crate::protocol::request::Request;
use crate::protocol::response::Response;

/// What the server told us about a file on the control channel
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FileMetadata {
    pub data_endpoint: SocketAddr,
    pub size: u64,
}

/// Asks the control endpoint for a file's size and the data port serving it
pub async fn negotiate(exchanger: &Exchanger, control_endpoint: SocketAddr, name: &str) -> TransferResult<FileMetadata> {
    let request = Request::Download { name: name.to_string() };
    let reply = exchanger.exchange(&request, control_endpoint).await?;

    match Response::parse(&reply) {
        Response::DownloadAck { name: acked_name, size, port } => {
            if acked_name != name {
                return Err(TransferError::protocol(format!("download reply for {} while negotiating {}", acked_name, name)));
            }
            if port == 0 {
                return Err(TransferError::protocol(format!("download reply for {} assigns data port 0", name)));
            }

            let metadata = FileMetadata {
                data_endpoint: data_endpoint(control_endpoint, port),
                size,
            };
            debug!(name, ?metadata, "negotiated");
            Ok(metadata)
        }
        Response::Rejected { name, reason } => Err(TransferError::Rejected { name, reason }),
        other => Err(TransferError::protocol(format!("expected download reply for {}, got {}: {:?}", name, other.kind(), reply))),
    }
}
