pub mod cache;
pub mod cli;
pub mod preview;
pub mod server;
pub mod source;
pub mod upstream;
pub mod worker;
