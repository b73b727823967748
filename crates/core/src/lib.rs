//! `keystone-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod outcome;

pub use entity::Audit;
pub use error::DomainError;
pub use id::{ClaimId, TenantId, UserId};
pub use outcome::{Failure, Outcome};
