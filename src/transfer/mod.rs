pub mod client;
pub mod download_list;
pub mod negotiate;
pub mod observer;
pub mod sequencer;
pub mod session;
