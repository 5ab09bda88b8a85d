// Frameworks layer: environment, tracing and binary bootstrap.

pub mod config;
pub mod probe;
pub mod telemetry;
