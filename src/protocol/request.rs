use std::fmt::{Display, Formatter};

/// Commands sent by the client. The wire form is the [Display] representation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Request {
    /// sent to the control endpoint to learn a file's size and data port
    Download { name: String },
    /// requests the inclusive byte range `start..=end`
    Get { name: String, start: u64, end: u64 },
    Close { name: String },
}

impl Request {
    pub fn name(&self) -> &str {
        match self {
            Request::Download { name } => name,
            Request::Get { name, .. } => name,
            Request::Close { name } => name,
        }
    }

    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Download { name } => write!(f, "DOWNLOAD {}", name),
            Request::Get { name, start, end } => write!(f, "FILE {} GET START {} END {}", name, start, end),
            Request::Close { name } => write!(f, "FILE {} CLOSE", name),
        }
    }
}
