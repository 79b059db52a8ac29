use std::cmp::min;
use std::io::SeekFrom;
use std::net::SocketAddr;

use tokio::io::{AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{TransferError, TransferResult};
use crate::net::exchange::Exchanger;
use crate::protocol::request::Request;
use crate::protocol::response::{decode_payload, Response};
use crate::transfer::observer::TransferObserver;

/// State of one file's transfer on its data endpoint: chunks are requested strictly one after the
///  other, and every chunk is written at its absolute offset. The session ends with a `CLOSE`
///  handshake once `downloaded` reaches `size`.
///
/// The server decides how many bytes a chunk actually has; the session only trusts the decoded
///  payload length, not the requested range.
pub struct TransferSession<'a> {
    exchanger: &'a Exchanger,
    observer: &'a dyn TransferObserver,
    name: String,
    data_endpoint: SocketAddr,
    size: u64,
    downloaded: u64,
    chunk_size: u64,
}

impl <'a> TransferSession<'a> {
    pub fn new(
        exchanger: &'a Exchanger,
        observer: &'a dyn TransferObserver,
        name: impl Into<String>,
        data_endpoint: SocketAddr,
        size: u64,
        chunk_size: u64,
    ) -> TransferSession<'a> {
        assert!(chunk_size > 0);

        TransferSession {
            exchanger,
            observer,
            name: name.into(),
            data_endpoint,
            size,
            downloaded: 0,
            chunk_size,
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Pulls all chunks into `output` and closes the session. On error, `output` holds all chunks
    ///  up to the failing one.
    pub async fn download<W>(&mut self, output: &mut W) -> TransferResult<()>
    where
        W: AsyncWrite + AsyncSeek + Unpin,
    {
        while self.downloaded < self.size {
            self.fetch_chunk(output).await?;
        }
        self.close().await
    }

    /// the inclusive byte range to request next
    fn next_range(&self) -> (u64, u64) {
        debug_assert!(self.downloaded < self.size);
        let start = self.downloaded;
        let end = min(start.saturating_add(self.chunk_size - 1), self.size - 1);
        (start, end)
    }

    async fn fetch_chunk<W>(&mut self, output: &mut W) -> TransferResult<()>
    where
        W: AsyncWrite + AsyncSeek + Unpin,
    {
        let (start, end) = self.next_range();
        let request = Request::Get { name: self.name.clone(), start, end };

        let reply = self.exchanger.exchange(&request, self.data_endpoint).await?;
        let payload = match Response::parse(&reply) {
            Response::ChunkAck { name, start: claimed_start, payload } => {
                if name != self.name {
                    return Err(TransferError::protocol(format!("chunk reply for {} while downloading {}", name, self.name)));
                }
                if let Some(claimed_start) = claimed_start {
                    if claimed_start != start {
                        return Err(TransferError::protocol(format!("chunk reply for offset {}, requested {}", claimed_start, start)));
                    }
                }
                payload
            }
            Response::Rejected { name, reason } => {
                return Err(TransferError::Rejected { name, reason });
            }
            other => {
                return Err(TransferError::protocol(format!("expected chunk reply for {}, got {}: {:?}", self.name, other.kind(), reply)));
            }
        };

        let data = decode_payload(&payload)?;
        if data.is_empty() {
            return Err(TransferError::protocol(format!("empty chunk for {} at offset {}", self.name, start)));
        }
        let new_downloaded = start + data.len() as u64;
        if new_downloaded > self.size {
            return Err(TransferError::protocol(format!("chunk for {} at offset {} with {} bytes exceeds file size {}", self.name, start, data.len(), self.size)));
        }

        place_chunk(output, start, &data).await?;
        self.downloaded = new_downloaded;

        trace!(name = %self.name, start, requested_end = end, len = data.len(), "chunk written");
        self.observer.on_chunk_written(&self.name, self.downloaded, self.size);
        Ok(())
    }

    /// Ends the session on the server with a `CLOSE` handshake
    pub async fn close(&self) -> TransferResult<()> {
        let request = Request::Close { name: self.name.clone() };

        let reply = self.exchanger.exchange(&request, self.data_endpoint).await
            .map_err(|e| TransferError::CloseFailed(Box::new(e)))?;

        match Response::parse(&reply) {
            Response::CloseAck { name: Some(name) } if name != self.name => {
                Err(TransferError::CloseFailed(Box::new(TransferError::protocol(format!("close reply for {} while closing {}", name, self.name)))))
            }
            Response::CloseAck { .. } => {
                debug!(name = %self.name, "session closed");
                Ok(())
            }
            other => {
                Err(TransferError::CloseFailed(Box::new(TransferError::protocol(format!("expected close reply, got {}: {:?}", other.kind(), reply)))))
            }
        }
    }
}

/// Writes `data` at absolute position `offset`. Writing the same chunk twice leaves the same
///  content.
pub async fn place_chunk<W>(output: &mut W, offset: u64, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + AsyncSeek + Unpin,
{
    output.seek(SeekFrom::Start(offset)).await?;
    output.write_all(data).await
}
