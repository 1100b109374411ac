pub mod catalog;
pub mod dispatch;
pub mod engine;
pub mod mapper;
pub mod outcome;
pub mod registry;
pub mod variant;

pub use engine::SmAdapter;
pub use outcome::Outcome;
pub use registry::{ApiVersion, EndpointDescriptor, EndpointRegistry, Operation};
