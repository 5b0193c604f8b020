//! backoffice-config
//!
//! Operator configuration for the back office: storage location, logging,
//! code allocation and listing defaults. Owns the Config model plus disk persistence.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::{default_base_dir, ConfigManager};
pub use model::{AllocatorSettings, Config, HierarchySettings, HierarchyStrategy, PaginationSettings};
