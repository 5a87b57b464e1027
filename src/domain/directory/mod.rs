//! Directory bounded context - number allocation and message routing

pub mod registry;
pub mod service;

pub use registry::{Directory, EndpointHandle};
pub use service::DirectoryService;
