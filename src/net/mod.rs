pub mod backoff;
pub mod exchange;
pub mod transport;
