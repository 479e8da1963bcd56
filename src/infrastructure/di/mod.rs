//! Dependency injection: wiring services from settings

mod service_container;

pub use service_container::ServiceContainer;
