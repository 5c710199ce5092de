pub mod channel;
pub mod correlation;
pub mod server;
