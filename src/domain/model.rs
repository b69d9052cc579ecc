use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Delivery statuses that count as "already reached" for a campaign.
pub const REACHED_STATUSES: [&str; 3] = ["sent", "delivered", "success"];

/// Opaque record key. Stores hand out either text keys (uuids) or integer keys,
/// and the stored representation is kept so records serialize back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

pub type ContactId = RecordId;

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value)
    }
}

/// Rule narrowing which contacts a campaign may reach.
///
/// Only tag membership is understood today. Any other shape deserializes to
/// `Unsupported` and places no restriction on the audience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudienceFilter {
    Tag { value: String },
    Unsupported { kind: Option<String> },
}

impl AudienceFilter {
    pub fn from_value(value: &Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str);
        match kind {
            Some("tag") => match value.get("value").and_then(Value::as_str) {
                Some(tag) if !tag.is_empty() => AudienceFilter::Tag {
                    value: tag.to_string(),
                },
                _ => AudienceFilter::Unsupported {
                    kind: Some("tag".to_string()),
                },
            },
            other => AudienceFilter::Unsupported {
                kind: other.map(str::to_string),
            },
        }
    }

    /// Tag every selected contact must carry, if this filter restricts by tag.
    pub fn required_tag(&self) -> Option<&str> {
        match self {
            AudienceFilter::Tag { value } => Some(value),
            AudienceFilter::Unsupported { .. } => None,
        }
    }
}

impl<'de> Deserialize<'de> for AudienceFilter {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(AudienceFilter::from_value(&value))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Campaign {
    pub id: RecordId,
    #[serde(default)]
    pub audience_filter: Option<AudienceFilter>,
    #[serde(default)]
    pub daily_limit: Option<i64>,
}

impl Campaign {
    pub fn required_tag(&self) -> Option<&str> {
        self.audience_filter
            .as_ref()
            .and_then(AudienceFilter::required_tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub campaign_id: RecordId,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    pub status: String,
}

impl DeliveryLogEntry {
    pub fn is_reached(&self) -> bool {
        REACHED_STATUSES.contains(&self.status.as_str())
    }
}

/// A contact record. Only `id` is typed; `tags` and every other column stay in
/// `attributes` exactly as the store returned them, null and absent alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Contact {
    /// String entries of the `tags` column. Null, missing or non-array tags yield nothing.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("tags")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_filter_parsing() {
        let campaign: Campaign = serde_json::from_value(json!({
            "id": "c2",
            "audience_filter": {"type": "tag", "value": "vip"},
            "daily_limit": null
        }))
        .unwrap();

        assert_eq!(campaign.required_tag(), Some("vip"));
        assert_eq!(campaign.daily_limit, None);
    }

    #[test]
    fn test_unrecognized_filters_do_not_restrict() {
        let shapes = [
            json!({"type": "segment", "value": "s1"}),
            json!({"type": "tag", "value": ""}),
            json!({"type": "tag"}),
            json!({"value": "vip"}),
            json!("vip"),
        ];

        for shape in shapes {
            let filter = AudienceFilter::from_value(&shape);
            assert_eq!(filter.required_tag(), None, "shape {} should not restrict", shape);
        }

        let campaign: Campaign = serde_json::from_value(json!({"id": 7})).unwrap();
        assert!(campaign.audience_filter.is_none());
        assert_eq!(campaign.id, RecordId::Number(7));
    }

    #[test]
    fn test_contact_preserves_extra_columns() {
        let raw = json!({
            "id": "a1",
            "tags": ["vip", "newsletter"],
            "email": "ada@example.com",
            "phone": null
        });

        let contact: Contact = serde_json::from_value(raw.clone()).unwrap();
        assert!(contact.has_tag("vip"));
        assert!(!contact.has_tag("churned"));
        assert_eq!(serde_json::to_value(&contact).unwrap(), raw);
    }

    #[test]
    fn test_contact_keeps_null_and_missing_tags() {
        let null_tags = json!({"id": "a1", "tags": null, "email": "x@y"});
        let contact: Contact = serde_json::from_value(null_tags.clone()).unwrap();
        assert!(!contact.has_tag("vip"));
        assert_eq!(contact.tags().count(), 0);
        assert_eq!(serde_json::to_value(&contact).unwrap(), null_tags);

        let no_tags = json!({"id": 2, "email": "x@y"});
        let contact: Contact = serde_json::from_value(no_tags.clone()).unwrap();
        assert_eq!(contact.tags().count(), 0);
        assert_eq!(serde_json::to_value(&contact).unwrap(), no_tags);
    }

    #[test]
    fn test_reached_statuses() {
        let entry = |status: &str| DeliveryLogEntry {
            campaign_id: "c1".into(),
            contact_id: Some("a1".into()),
            status: status.to_string(),
        };

        assert!(entry("sent").is_reached());
        assert!(entry("delivered").is_reached());
        assert!(entry("success").is_reached());
        assert!(!entry("failed").is_reached());
        assert!(!entry("queued").is_reached());
    }
}
