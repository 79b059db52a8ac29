pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod transfer;

#[cfg(test)]
pub mod test_util;
