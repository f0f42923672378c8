//! Keeps a kubeconfig in sync with the DigitalOcean Kubernetes clusters of an account.
//!
//! Entries written by this crate follow a naming convention (see [`ownership`]) and carry
//! the remote cluster ID (see [`identity`]). Only such entries are ever modified or
//! removed; everything else in the kubeconfig is left as it was.

pub mod backup;
pub mod directory;
pub mod document;
pub mod error;
pub mod file;
pub mod identity;
pub mod merge;
pub mod ownership;
pub mod prune;
pub mod reconcile;
pub mod save;

pub use directory::{ClusterDescriptor, ClusterDirectory};
pub use document::Kubeconfig;
pub use error::{Collision, CollisionKind, Error, Result};
pub use file::KubeconfigFile;
pub use reconcile::{reconcile, sync, Reconciliation, SyncOptions, SyncReport};
pub use save::{save, SaveOptions, SaveReport};
