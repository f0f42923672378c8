pub mod commands;
pub mod credentials;
pub mod telemetry;
