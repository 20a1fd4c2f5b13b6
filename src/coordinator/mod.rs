pub mod service;
pub mod types;

pub use service::Coordinator;
pub use types::*;
