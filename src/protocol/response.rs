use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// A server reply, decoded once from its whitespace separated text form.
///
/// Recognized shapes:
/// ```ascii
/// OK <name> SIZE <n> PORT <p> ...        download ack (SIZE / PORT may appear in any order)
/// FILE <name> OK ... DATA <base64...>    chunk ack, payload is everything after DATA
/// ... CLOSE_OK ...                       close ack, unless it carries DATA
/// ERR <name> <reason...>                 rejection
/// ```
/// Anything else is [Response::Malformed].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Response {
    DownloadAck { name: String, size: u64, port: u16 },
    /// `payload` holds the base64 tokens rejoined with single spaces, still encoded. `start` is
    ///  the offset the server claims for the payload, if it sends one.
    ChunkAck { name: String, start: Option<u64>, payload: String },
    /// `name` is only known if the reply has the form `FILE <name> CLOSE_OK`
    CloseAck { name: Option<String> },
    Rejected { name: String, reason: String },
    Malformed(String),
}

const CLOSE_OK: &str = "CLOSE_OK";

impl Response {
    pub fn parse(raw: &str) -> Response {
        let tokens = raw.split_whitespace().collect::<Vec<_>>();

        match tokens.as_slice() {
            ["FILE", name, "OK", rest @ ..] if rest.contains(&"DATA") => {
                match rest.iter().position(|&t| t == "DATA") {
                    Some(idx) => Response::ChunkAck {
                        name: name.to_string(),
                        start: number_after::<u64>(&rest[..idx], "START"),
                        payload: rest[idx+1..].join(" "),
                    },
                    None => Response::Malformed(raw.to_string()),
                }
            }
            _ if tokens.contains(&CLOSE_OK) => {
                let name = match tokens.as_slice() {
                    ["FILE", name, ..] if *name != CLOSE_OK => Some(name.to_string()),
                    _ => None,
                };
                Response::CloseAck { name }
            }
            ["OK", name, rest @ ..] => {
                match (number_after::<u64>(rest, "SIZE"), number_after::<u16>(rest, "PORT")) {
                    (Some(size), Some(port)) => Response::DownloadAck {
                        name: name.to_string(),
                        size,
                        port,
                    },
                    _ => Response::Malformed(raw.to_string()),
                }
            }
            ["ERR", name, reason @ ..] => Response::Rejected {
                name: name.to_string(),
                reason: reason.join(" "),
            },
            _ => Response::Malformed(raw.to_string()),
        }
    }

    /// short name of the variant for log output
    pub fn kind(&self) -> &'static str {
        match self {
            Response::DownloadAck { .. } => "download ack",
            Response::ChunkAck { .. } => "chunk ack",
            Response::CloseAck { .. } => "close ack",
            Response::Rejected { .. } => "rejection",
            Response::Malformed(_) => "malformed reply",
        }
    }
}

fn number_after<T: std::str::FromStr>(tokens: &[&str], keyword: &str) -> Option<T> {
    let idx = tokens.iter().position(|&t| t == keyword)?;
    tokens.get(idx + 1)?
        .parse()
        .ok()
}

/// Decodes a chunk payload. Whitespace inside the payload is not part of the encoding and is
///  skipped.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact = payload.split_whitespace().collect::<String>();
    STANDARD.decode(compact)
}
