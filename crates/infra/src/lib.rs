//! Infrastructure layer: configuration, persistence, and the permission
//! synchronizer that keeps stored claims in line with the role catalog.

pub mod authorization;
pub mod config;
pub mod repositories;

pub use authorization::{PermissionSynchronizer, SyncError};
pub use config::{AppConfig, BootstrapAdmin, ConfigError};
pub use repositories::{
    InMemoryTenantRepository, InMemoryUserRepository, PostgresTenantRepository, PostgresUserRepository,
    RepositoryError, TenantRepository, UserRepository,
};
