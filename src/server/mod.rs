//! Server module for building the gateway HTTP server
//!
//! - `ModelRegistry`: schema registry built from configuration
//! - `GatewayHost`: the pipeline, independent of transport
//! - `GatewayBuilder`: wiring, router and graceful serve

pub mod builder;
pub mod exposure;
pub mod host;
pub mod model_registry;

pub use builder::GatewayBuilder;
pub use exposure::RestExposure;
pub use host::{ErrorRendering, GatewayHost, GatewayRequest};
pub use model_registry::ModelRegistry;
