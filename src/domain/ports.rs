use crate::domain::model::{Campaign, Contact, ContactId};
use crate::domain::query::ContactQuery;
use crate::utils::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeSet;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Looks up a single campaign. `Ok(None)` when no record has this id.
    async fn get_campaign(&self, campaign_id: &str) -> StoreResult<Option<Campaign>>;
}

#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    /// Non-null contact ids logged for the campaign with a reached status.
    async fn reached_contact_ids(&self, campaign_id: &str) -> StoreResult<BTreeSet<ContactId>>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find_contacts(&self, query: &ContactQuery) -> StoreResult<Vec<Contact>>;
}
