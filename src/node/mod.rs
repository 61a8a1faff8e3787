pub mod constants;
pub mod registry;
pub mod rest;
pub mod session;
pub mod worker;

pub use registry::{Node, NodeRegistry};
pub use rest::{NodeRest, RestClient};
pub use session::{NodeSession, SessionStatus};
pub use worker::{NodeCommand, spawn_command_worker};
