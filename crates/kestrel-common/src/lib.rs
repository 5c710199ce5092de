pub mod envelope;
pub mod error;
pub mod formatter;
pub mod mapping;
pub mod protocol;
