use crate::domain::model::ContactId;
use std::collections::BTreeSet;

/// Which contacts must be left out of a selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Exclusion {
    #[default]
    None,
    /// Exclusion list collected from the delivery log ahead of the query.
    Ids(BTreeSet<ContactId>),
    /// The store joins against its own delivery log for this campaign.
    ReachedBy(String),
}

/// Declarative contact query built by the selector and executed by a
/// [`ContactStore`](crate::domain::ports::ContactStore).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactQuery {
    pub tag: Option<String>,
    pub exclusion: Exclusion,
    pub limit: Option<u64>,
}

impl ContactQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Excludes the given ids. An empty set leaves the query unrestricted.
    pub fn excluding(mut self, ids: BTreeSet<ContactId>) -> Self {
        self.exclusion = if ids.is_empty() {
            Exclusion::None
        } else {
            Exclusion::Ids(ids)
        };
        self
    }

    pub fn excluding_reached_by(mut self, campaign_id: impl Into<String>) -> Self {
        self.exclusion = Exclusion::ReachedBy(campaign_id.into());
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_exclusion_set_is_no_exclusion() {
        let query = ContactQuery::new().excluding(BTreeSet::new());
        assert_eq!(query.exclusion, Exclusion::None);

        let ids: BTreeSet<ContactId> = ["a1".into(), "a2".into()].into_iter().collect();
        let query = ContactQuery::new().with_tag("vip").excluding(ids.clone());
        assert_eq!(query.tag.as_deref(), Some("vip"));
        assert_eq!(query.exclusion, Exclusion::Ids(ids));
    }
}
