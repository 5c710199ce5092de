pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod resource;
pub mod schema;
pub mod store;
pub mod tools;

pub use kestrel_common::envelope;
pub use kestrel_common::error::DispatchError;
pub use kestrel_common::formatter;
pub use kestrel_common::mapping;
pub use kestrel_common::protocol;
