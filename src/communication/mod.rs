pub mod types;
pub mod registry;
pub mod protocol;
pub mod handler;

pub use types::*;
pub use registry::{commands, services, CommandRegistry};
pub use protocol::JsonProtocol;
pub use handler::{Dispatcher, ServiceHandler};
