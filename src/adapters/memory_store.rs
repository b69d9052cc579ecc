use crate::domain::model::{Campaign, Contact, ContactId, DeliveryLogEntry};
use crate::domain::ports::{CampaignStore, ContactStore, DeliveryLogStore, StoreResult};
use crate::domain::query::{ContactQuery, Exclusion};
use crate::utils::error::{Result, SelectionError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Contents of a store snapshot file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub delivery_logs: Vec<DeliveryLogEntry>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Number of calls served per store operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub campaign_lookups: usize,
    pub log_queries: usize,
    pub contact_queries: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.campaign_lookups + self.log_queries + self.contact_queries
    }
}

#[derive(Debug, Default)]
struct State {
    snapshot: StoreSnapshot,
    calls: CallCounts,
    last_contact_query: Option<ContactQuery>,
}

/// Store held entirely in memory. Contacts come back in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                snapshot,
                ..State::default()
            })),
        }
    }

    /// Loads a JSON snapshot of the form `{ campaigns, delivery_logs, contacts }`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SelectionError::Config {
            message: format!("cannot read snapshot {}: {}", path.display(), e),
        })?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&content).map_err(|e| SelectionError::Config {
                message: format!("invalid snapshot {}: {}", path.display(), e),
            })?;

        tracing::debug!(
            campaigns = snapshot.campaigns.len(),
            delivery_logs = snapshot.delivery_logs.len(),
            contacts = snapshot.contacts.len(),
            "loaded store snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn insert_campaign(&self, campaign: Campaign) {
        self.state.lock().await.snapshot.campaigns.push(campaign);
    }

    pub async fn extend_contacts(&self, contacts: Vec<Contact>) {
        self.state.lock().await.snapshot.contacts.extend(contacts);
    }

    pub async fn push_log(&self, entry: DeliveryLogEntry) {
        self.state.lock().await.snapshot.delivery_logs.push(entry);
    }

    pub async fn calls(&self) -> CallCounts {
        self.state.lock().await.calls
    }

    pub async fn last_contact_query(&self) -> Option<ContactQuery> {
        self.state.lock().await.last_contact_query.clone()
    }
}

fn reached_ids(logs: &[DeliveryLogEntry], campaign_id: &str) -> BTreeSet<ContactId> {
    logs.iter()
        .filter(|entry| entry.campaign_id.to_string() == campaign_id && entry.is_reached())
        .filter_map(|entry| entry.contact_id.clone())
        .collect()
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn get_campaign(&self, campaign_id: &str) -> StoreResult<Option<Campaign>> {
        let mut state = self.state.lock().await;
        state.calls.campaign_lookups += 1;

        Ok(state
            .snapshot
            .campaigns
            .iter()
            .find(|c| c.id.to_string() == campaign_id)
            .cloned())
    }
}

#[async_trait]
impl DeliveryLogStore for InMemoryStore {
    async fn reached_contact_ids(&self, campaign_id: &str) -> StoreResult<BTreeSet<ContactId>> {
        let mut state = self.state.lock().await;
        state.calls.log_queries += 1;

        Ok(reached_ids(&state.snapshot.delivery_logs, campaign_id))
    }
}

#[async_trait]
impl ContactStore for InMemoryStore {
    async fn find_contacts(&self, query: &ContactQuery) -> StoreResult<Vec<Contact>> {
        let mut state = self.state.lock().await;
        state.calls.contact_queries += 1;
        state.last_contact_query = Some(query.clone());

        let excluded = match &query.exclusion {
            Exclusion::None => BTreeSet::new(),
            Exclusion::Ids(ids) => ids.clone(),
            Exclusion::ReachedBy(campaign_id) => {
                reached_ids(&state.snapshot.delivery_logs, campaign_id)
            }
        };
        let limit = query.limit.map_or(usize::MAX, |n| n as usize);

        Ok(state
            .snapshot
            .contacts
            .iter()
            .filter(|c| query.tag.as_deref().map_or(true, |tag| c.has_tag(tag)))
            .filter(|c| !excluded.contains(&c.id))
            .take(limit)
            .cloned()
            .collect())
    }
}
