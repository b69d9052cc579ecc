pub mod limit;
pub mod request;
pub mod selector;

pub use crate::domain::model::{Campaign, Contact};
pub use crate::domain::ports::{CampaignStore, ContactStore, DeliveryLogStore};
pub use crate::utils::error::Result;
