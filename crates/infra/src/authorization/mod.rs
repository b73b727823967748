//! Keeps a user's stored `permission` claims in line with the catalog.

mod permission_sync;

pub use permission_sync::{PermissionSynchronizer, SyncError};
