//! Dependency injection: wiring of stores and services

mod service_container;

pub use service_container::ServiceContainer;
