use crate::config::settings::{Settings, TableNames};
use crate::domain::model::{Campaign, Contact, ContactId, RecordId, REACHED_STATUSES};
use crate::domain::ports::{CampaignStore, ContactStore, DeliveryLogStore, StoreResult};
use crate::domain::query::{ContactQuery, Exclusion};
use crate::utils::error::{Result, SelectionError, StoreError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Backing store reached through a PostgREST-style HTTP interface.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    rest_url: String,
    tables: TableNames,
    audience_function: String,
}

#[derive(Deserialize)]
struct LogRow {
    contact_id: Option<ContactId>,
}

#[derive(Serialize)]
struct AudienceCall<'a> {
    campaign_id: &'a str,
    tag: Option<&'a str>,
    max_rows: Option<u64>,
}

impl RestStore {
    pub fn new(settings: &Settings) -> Result<Self> {
        let key = &settings.store.service_key;
        let config_error = |message: String| SelectionError::Config { message };

        let mut apikey = HeaderValue::from_str(key)
            .map_err(|e| config_error(format!("service key is not a valid header: {}", e)))?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| config_error(format!("service key is not a valid header: {}", e)))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        // The per-call budget is enforced by the selector; only connecting is bounded here.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(settings.store.timeout_seconds))
            .build()
            .map_err(|e| config_error(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", settings.store.base_url.trim_end_matches('/')),
            tables: settings.store.tables.clone(),
            audience_function: settings.selection.audience_function.clone(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.rest_url, name)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("store response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Quotes a text value for use inside a PostgREST list or a Postgres array literal.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn id_list(ids: &BTreeSet<ContactId>) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| match id {
            RecordId::Number(n) => n.to_string(),
            RecordId::Text(s) => quoted(s),
        })
        .collect();
    format!("({})", items.join(","))
}

#[async_trait]
impl CampaignStore for RestStore {
    async fn get_campaign(&self, campaign_id: &str) -> StoreResult<Option<Campaign>> {
        let url = self.table(&self.tables.campaigns);
        tracing::debug!("Looking up campaign {} at {}", campaign_id, url);

        let request = self.client.get(url).query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{}", campaign_id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<Campaign> = self.fetch(request).await?;

        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl DeliveryLogStore for RestStore {
    async fn reached_contact_ids(&self, campaign_id: &str) -> StoreResult<BTreeSet<ContactId>> {
        let url = self.table(&self.tables.delivery_logs);
        tracing::debug!("Reading delivery log for campaign {} at {}", campaign_id, url);

        let request = self.client.get(url).query(&[
            ("select", "contact_id".to_string()),
            ("campaign_id", format!("eq.{}", campaign_id)),
            ("status", format!("in.({})", REACHED_STATUSES.join(","))),
            ("contact_id", "not.is.null".to_string()),
        ]);
        let rows: Vec<LogRow> = self.fetch(request).await?;

        Ok(rows.into_iter().filter_map(|row| row.contact_id).collect())
    }
}

#[async_trait]
impl ContactStore for RestStore {
    async fn find_contacts(&self, query: &ContactQuery) -> StoreResult<Vec<Contact>> {
        let request = match &query.exclusion {
            Exclusion::ReachedBy(campaign_id) => {
                let url = format!("{}/rpc/{}", self.rest_url, self.audience_function);
                tracing::debug!("Calling audience function at {}", url);

                self.client.post(url).json(&AudienceCall {
                    campaign_id: campaign_id.as_str(),
                    tag: query.tag.as_deref(),
                    max_rows: query.limit,
                })
            }
            exclusion => {
                let url = self.table(&self.tables.contacts);
                let mut params = vec![("select", "*".to_string())];

                if let Some(tag) = &query.tag {
                    params.push(("tags", format!("cs.{{{}}}", quoted(tag))));
                }
                if let Exclusion::Ids(ids) = exclusion {
                    params.push(("id", format!("not.in.{}", id_list(ids))));
                }
                if let Some(limit) = query.limit {
                    params.push(("limit", limit.to_string()));
                }

                tracing::debug!("Querying contacts at {} ({} filters)", url, params.len() - 1);
                self.client.get(url).query(&params)
            }
        };

        self.fetch(request).await
    }
}
