use crate::core::limit::parse_requested_limit;
use crate::domain::model::RecordId;
use serde::Deserialize;
use serde_json::Value;

/// Body of a selection request: `{ "campaignId": ..., "limit": ... }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectAudienceRequest {
    #[serde(default)]
    pub campaign_id: Option<RecordId>,
    #[serde(default)]
    pub limit: Option<Value>,
}

impl SelectAudienceRequest {
    /// Campaign id as text; empty when the field was absent.
    pub fn campaign_id(&self) -> String {
        self.campaign_id
            .as_ref()
            .map(RecordId::to_string)
            .unwrap_or_default()
    }

    pub fn requested_limit(&self) -> Option<i64> {
        self.limit.as_ref().and_then(parse_requested_limit)
    }
}
