//! Reference resource managers.
//!
//! # Available Managers
//!
//! * [`StandardResourceManager`] - serves one endpoint over any
//!   [`StorageProvider`](crate::storage::StorageProvider), with uniqueness,
//!   `meta` stamping, version preconditions and PATCH support.
//!
//! Hosts with their own persistence implement
//! [`ResourceManager`](crate::manager::ResourceManager) directly instead.

pub mod patch;
pub mod standard;

pub use standard::{GROUP_SCHEMA, StandardResourceManager, USER_SCHEMA};
