pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
#[cfg(feature = "server")]
pub mod http;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::Settings;

pub use crate::adapters::{memory_store::InMemoryStore, rest_store::RestStore};
pub use crate::core::selector::{AudienceSelector, ExclusionStrategy, SelectorOptions};
pub use crate::domain::model::{AudienceFilter, Campaign, Contact, ContactId, DeliveryLogEntry, RecordId};
pub use crate::utils::error::{ErrorKind, Result, SelectionError, StoreError};
