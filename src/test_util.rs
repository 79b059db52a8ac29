use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::TransferError;
use crate::net::transport::DatagramTransport;
use crate::transfer::observer::TransferObserver;

type Handler = Box<dyn FnMut(&str, SocketAddr) -> Option<String> + Send>;

/// In-memory stand-in for the network and the server behind it: every request sent through it
///  is passed to a handler, and the handler's reply (if any) is queued for `recv_from`. Requests
///  can be dropped to simulate packet loss; a request without reply leaves `recv_from` pending
///  forever, which combined with paused tokio time makes timeouts deterministic.
pub struct FakeServer {
    handler: Mutex<Handler>,
    reply_from: Mutex<Option<SocketAddr>>,
    num_to_drop: Mutex<usize>,
    inbox: Mutex<VecDeque<(Bytes, SocketAddr)>>,
    inbox_notify: Notify,
    sent: Mutex<Vec<(SocketAddr, String, Instant)>>,
}

impl FakeServer {
    pub fn new(handler: impl FnMut(&str, SocketAddr) -> Option<String> + Send + 'static) -> Arc<FakeServer> {
        Arc::new(FakeServer {
            handler: Mutex::new(Box::new(handler)),
            reply_from: Mutex::new(None),
            num_to_drop: Mutex::new(0),
            inbox: Default::default(),
            inbox_notify: Notify::new(),
            sent: Default::default(),
        })
    }

    /// a server that never replies
    pub fn silent() -> Arc<FakeServer> {
        Self::new(|_, _| None)
    }

    /// the first `n` requests are lost on the way to the server
    pub fn dropping_first(n: usize, handler: impl FnMut(&str, SocketAddr) -> Option<String> + Send + 'static) -> Arc<FakeServer> {
        let result = Self::new(handler);
        result.drop_next(n);
        result
    }

    /// replies appear to come from `addr` rather than from the request's destination
    pub fn with_reply_from(self: Arc<Self>, addr: SocketAddr) -> Arc<Self> {
        *self.reply_from.lock().unwrap() = Some(addr);
        self
    }

    pub fn drop_next(&self, n: usize) {
        *self.num_to_drop.lock().unwrap() = n;
    }

    /// queues a datagram that was not triggered by any request
    pub fn inject(&self, text: &str) {
        self.push_reply(text.to_string(), "127.0.0.1:9".parse().unwrap());
    }

    pub fn sent_requests(&self) -> Vec<(SocketAddr, String)> {
        self.sent.lock().unwrap().iter()
            .map(|(to, req, _)| (*to, req.clone()))
            .collect()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter()
            .map(|(_, req, _)| req.clone())
            .collect()
    }

    pub fn send_instants(&self) -> Vec<Instant> {
        self.sent.lock().unwrap().iter()
            .map(|(_, _, t)| *t)
            .collect()
    }

    fn push_reply(&self, text: String, from: SocketAddr) {
        self.inbox.lock().unwrap().push_back((Bytes::from(text), from));
        self.inbox_notify.notify_one();
    }
}

#[async_trait]
impl DatagramTransport for FakeServer {
    async fn send_to(&self, to: SocketAddr, buf: &[u8]) -> anyhow::Result<()> {
        let text = String::from_utf8_lossy(buf).into_owned();
        self.sent.lock().unwrap().push((to, text.clone(), Instant::now()));

        {
            let mut num_to_drop = self.num_to_drop.lock().unwrap();
            if *num_to_drop > 0 {
                *num_to_drop -= 1;
                return Ok(());
            }
        }

        let reply = {
            let mut handler = self.handler.lock().unwrap();
            handler(&text, to)
        };
        if let Some(reply) = reply {
            let from = self.reply_from.lock().unwrap().unwrap_or(to);
            self.push_reply(reply, from);
        }
        Ok(())
    }

    async fn recv_from(&self) -> anyhow::Result<(Bytes, SocketAddr)> {
        loop {
            if let Some(datagram) = self.inbox.lock().unwrap().pop_front() {
                return Ok(datagram);
            }
            self.inbox_notify.notified().await;
        }
    }

    fn discard_pending(&self) -> usize {
        let mut inbox = self.inbox.lock().unwrap();
        let result = inbox.len();
        inbox.clear();
        result
    }
}

/// deterministic, non-repeating-looking file content
pub fn test_bytes(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 7 + i / 251) % 256) as u8)
        .collect()
}

/// Handler implementing the server side of the protocol for a fixed set of files. Every file gets
///  its own data port, starting at `first_data_port`. If `reply_len` is set, chunk replies carry
///  that many bytes regardless of the requested range (clipped at the end of the file).
pub fn serve_files(
    files: Vec<(&str, Vec<u8>)>,
    first_data_port: u16,
    reply_len: Option<usize>,
) -> impl FnMut(&str, SocketAddr) -> Option<String> + Send + 'static {
    let files = files.into_iter()
        .map(|(name, content)| (name.to_string(), content))
        .collect::<HashMap<_, _>>();
    let mut ports = HashMap::<String, u16>::new();

    move |request, _to| {
        let tokens = request.split_whitespace().collect::<Vec<_>>();
        match tokens.as_slice() {
            ["DOWNLOAD", name] => {
                let Some(content) = files.get(*name) else {
                    return Some(format!("ERR {} NOT_FOUND", name));
                };
                let next_port = first_data_port + ports.len() as u16;
                let port = *ports.entry(name.to_string()).or_insert(next_port);
                Some(format!("OK {} SIZE {} PORT {}", name, content.len(), port))
            }
            ["FILE", name, "GET", "START", start, "END", end] => {
                let content = files.get(*name)?;
                let start = start.parse::<usize>().ok()?;
                let end = end.parse::<usize>().ok()?;
                if start >= content.len() {
                    return Some(format!("ERR {} BAD_RANGE", name));
                }
                let end_exclusive = match reply_len {
                    Some(len) => start + len,
                    None => end + 1,
                }.min(content.len());
                let data = STANDARD.encode(&content[start..end_exclusive]);
                Some(format!("FILE {} OK START {} END {} DATA {}", name, start, end_exclusive - 1, data))
            }
            ["FILE", name, "CLOSE"] => Some(format!("FILE {} CLOSE_OK", name)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ObservedEvent {
    Started(String, u64),
    Chunk(String, u64, u64),
    Completed(String, u64),
    Failed(String),
}

/// Records all observer callbacks for later assertions
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}
impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn chunks_for(&self, name: &str) -> usize {
        self.events().iter()
            .filter(|e| matches!(e, ObservedEvent::Chunk(n, _, _) if n == name))
            .count()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events().into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Failed(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

impl TransferObserver for RecordingObserver {
    fn on_file_started(&self, name: &str, size: u64) {
        self.events.lock().unwrap().push(ObservedEvent::Started(name.to_string(), size));
    }

    fn on_chunk_written(&self, name: &str, downloaded: u64, size: u64) {
        self.events.lock().unwrap().push(ObservedEvent::Chunk(name.to_string(), downloaded, size));
    }

    fn on_file_completed(&self, name: &str, size: u64) {
        self.events.lock().unwrap().push(ObservedEvent::Completed(name.to_string(), size));
    }

    fn on_file_failed(&self, name: &str, _error: &TransferError) {
        self.events.lock().unwrap().push(ObservedEvent::Failed(name.to_string()));
    }
}
