use crate::core::limit::effective_limit;
use crate::domain::model::{Campaign, Contact};
use crate::domain::ports::{CampaignStore, ContactStore, DeliveryLogStore, StoreResult};
use crate::domain::query::ContactQuery;
use crate::utils::error::{Result, SelectionError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where already-reached contacts are removed from the audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionStrategy {
    /// Read the delivery log first and send the reached ids with the contact query.
    #[default]
    Inline,
    /// Let the contact store anti-join against the delivery log itself.
    ServerSide,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectorOptions {
    pub exclusion: ExclusionStrategy,
    pub store_timeout: Duration,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            exclusion: ExclusionStrategy::Inline,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Picks the contacts a campaign may message next.
///
/// A selection is a pure read: look up the campaign, collect the contacts the
/// campaign has already reached, then query the remaining audience capped at the
/// effective limit. Any store failure aborts the whole selection.
pub struct AudienceSelector {
    campaigns: Arc<dyn CampaignStore>,
    delivery_log: Arc<dyn DeliveryLogStore>,
    contacts: Arc<dyn ContactStore>,
    options: SelectorOptions,
}

impl AudienceSelector {
    /// Builds a selector over a single backend that serves all three stores.
    pub fn new<S>(store: Arc<S>, options: SelectorOptions) -> Self
    where
        S: CampaignStore + DeliveryLogStore + ContactStore + 'static,
    {
        Self {
            campaigns: store.clone(),
            delivery_log: store.clone(),
            contacts: store,
            options,
        }
    }

    pub fn from_parts(
        campaigns: Arc<dyn CampaignStore>,
        delivery_log: Arc<dyn DeliveryLogStore>,
        contacts: Arc<dyn ContactStore>,
        options: SelectorOptions,
    ) -> Self {
        Self {
            campaigns,
            delivery_log,
            contacts,
            options,
        }
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    pub async fn select(
        &self,
        campaign_id: &str,
        requested_limit: Option<i64>,
    ) -> Result<Vec<Contact>> {
        let campaign_id = campaign_id.trim();
        if campaign_id.is_empty() {
            return Err(SelectionError::MissingCampaignId);
        }

        let campaign_lookup = self.bounded("campaign lookup", self.campaigns.get_campaign(campaign_id));

        let query = match self.options.exclusion {
            ExclusionStrategy::Inline => {
                // Campaign and log lookups are independent; the campaign result is
                // checked first so a missing campaign always wins over a log failure.
                let log_lookup = self.bounded(
                    "delivery log query",
                    self.delivery_log.reached_contact_ids(campaign_id),
                );
                let (campaign, reached) = tokio::join!(campaign_lookup, log_lookup);
                let campaign = Self::require_campaign(campaign_id, campaign)?;
                let reached = reached?.map_err(|source| SelectionError::LogQuery { source })?;

                tracing::debug!(
                    campaign_id = %campaign_id,
                    excluded = reached.len(),
                    "exclusions collected"
                );

                Self::base_query(&campaign, requested_limit).excluding(reached)
            }
            ExclusionStrategy::ServerSide => {
                let campaign = Self::require_campaign(campaign_id, campaign_lookup.await)?;
                Self::base_query(&campaign, requested_limit).excluding_reached_by(campaign_id)
            }
        };

        tracing::debug!(
            campaign_id = %campaign_id,
            tag = ?query.tag,
            limit = ?query.limit,
            "querying contacts"
        );

        let contacts = self
            .bounded("contact query", self.contacts.find_contacts(&query))
            .await?
            .map_err(|source| SelectionError::ContactQuery { source })?;

        tracing::info!(
            campaign_id = %campaign_id,
            selected = contacts.len(),
            limit = ?query.limit,
            "contacts selected"
        );

        Ok(contacts)
    }

    fn base_query(campaign: &Campaign, requested_limit: Option<i64>) -> ContactQuery {
        let query =
            ContactQuery::new().with_limit(effective_limit(requested_limit, campaign.daily_limit));

        match campaign.required_tag() {
            Some(tag) => query.with_tag(tag),
            None => query,
        }
    }

    fn require_campaign(
        campaign_id: &str,
        lookup: Result<StoreResult<Option<Campaign>>>,
    ) -> Result<Campaign> {
        let campaign = lookup?
            .map_err(|source| SelectionError::CampaignLookup { source })?
            .ok_or_else(|| SelectionError::CampaignNotFound {
                campaign_id: campaign_id.to_string(),
            })?;

        tracing::debug!(
            campaign_id = %campaign_id,
            filter = ?campaign.audience_filter,
            daily_limit = ?campaign.daily_limit,
            "campaign loaded"
        );
        Ok(campaign)
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<StoreResult<T>>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let timeout = self.options.store_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Err(e)) if e.is_timeout() => Err(SelectionError::Timeout { operation, timeout }),
            Ok(result) => Ok(result),
            Err(_) => Err(SelectionError::Timeout { operation, timeout }),
        }
    }
}
