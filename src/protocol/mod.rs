//! Text framing of the file transfer protocol. Every message is a single UDP datagram holding
//!  whitespace separated tokens; there are no request ids, so a reply is matched to its request
//!  only by the fact that there is at most one request in flight.

pub mod request;
pub mod response;
