//! DigitalOcean Kubernetes API client, and the [`ClusterDirectory`] it backs.
//!
//! [`ClusterDirectory`]: doks_kubeconfig::ClusterDirectory

pub mod client;
pub mod directory;
pub mod error;

pub use client::{Client, DEFAULT_API_URL};
pub use directory::AccountDirectory;
pub use error::{Error, Result};
