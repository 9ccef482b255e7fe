// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Slot labels and label selectors.
//!
//! Every occupied slot carries the labels of the claim that owns it. Owner
//! lookups, parent resolution for dynamic claims and entry materialisation
//! are all expressed as selector matches over these labels.

use crate::{IdError, IdResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Ordered label map
pub type Labels = BTreeMap<String, String>;

/// Prefix reserved for system label keys
pub const LABEL_PREFIX: &str = "idspace.dev/";

pub const LABEL_CLAIM_NAME: &str = "idspace.dev/claim-name";
pub const LABEL_CLAIM_UID: &str = "idspace.dev/claim-uid";
pub const LABEL_CLAIM_TYPE: &str = "idspace.dev/claim-type";
pub const LABEL_OWNER_GROUP: &str = "idspace.dev/owner-group";
pub const LABEL_OWNER_VERSION: &str = "idspace.dev/owner-version";
pub const LABEL_OWNER_KIND: &str = "idspace.dev/owner-kind";
pub const LABEL_OWNER_NAMESPACE: &str = "idspace.dev/owner-namespace";
pub const LABEL_OWNER_NAME: &str = "idspace.dev/owner-name";

pub fn is_system_label(key: &str) -> bool {
    key.starts_with(LABEL_PREFIX)
}

/// Strip system labels, keeping only user-defined ones
pub fn user_labels(labels: &Labels) -> Labels {
    labels
        .iter()
        .filter(|(k, _)| !is_system_label(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Set-based selector operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

/// One set-based requirement of a [`LabelSelector`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl LabelSelectorRequirement {
    fn matches(&self, labels: &Labels) -> bool {
        match self.operator {
            SelectorOperator::In => labels
                .get(&self.key)
                .is_some_and(|v| self.values.iter().any(|x| x == v)),
            SelectorOperator::NotIn => labels
                .get(&self.key)
                .map_or(true, |v| self.values.iter().all(|x| x != v)),
            SelectorOperator::Exists => labels.contains_key(&self.key),
            SelectorOperator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

/// Label query: all `match_labels` must be equal and all expressions hold.
/// An empty selector matches every label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: Labels,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

impl LabelSelector {
    /// Equality selector over the given labels
    pub fn from_labels(labels: Labels) -> Self {
        Self {
            match_labels: labels,
            match_expressions: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.match_labels.insert(key.into(), value.into());
        self
    }

    pub fn with_expression(
        mut self,
        key: impl Into<String>,
        operator: SelectorOperator,
        values: Vec<String>,
    ) -> Self {
        self.match_expressions.push(LabelSelectorRequirement {
            key: key.into(),
            operator,
            values,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
            && self.match_expressions.iter().all(|r| r.matches(labels))
    }

    /// `In`/`NotIn` need values, `Exists`/`DoesNotExist` must have none
    pub fn validate(&self) -> IdResult<()> {
        for req in &self.match_expressions {
            if req.key.is_empty() {
                return Err(IdError::InvalidClaim("selector key must not be empty".to_string()));
            }
            let needs_values = matches!(req.operator, SelectorOperator::In | SelectorOperator::NotIn);
            if needs_values == req.values.is_empty() {
                return Err(IdError::InvalidClaim(format!(
                    "selector operator {:?} on '{}' {} values",
                    req.operator,
                    req.key,
                    if needs_values { "requires" } else { "does not take" }
                )));
            }
        }
        Ok(())
    }
}

impl Display for LabelSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        for req in &self.match_expressions {
            parts.push(match req.operator {
                SelectorOperator::In => format!("{} in ({})", req.key, req.values.join(",")),
                SelectorOperator::NotIn => format!("{} notin ({})", req.key, req.values.join(",")),
                SelectorOperator::Exists => req.key.clone(),
                SelectorOperator::DoesNotExist => format!("!{}", req.key),
            });
        }
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_equality_match() {
        let selector = LabelSelector::default().with_label("app", "vpn");
        assert!(selector.matches(&labels(&[("app", "vpn"), ("tier", "core")])));
        assert!(!selector.matches(&labels(&[("app", "web")])));
        assert!(!selector.matches(&Labels::new()));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = LabelSelector::default();
        assert!(selector.is_empty());
        assert!(selector.matches(&Labels::new()));
    }

    #[test]
    fn test_expressions() {
        let selector = LabelSelector::default()
            .with_expression("tier", SelectorOperator::In, vec!["core".into(), "edge".into()])
            .with_expression("legacy", SelectorOperator::DoesNotExist, vec![]);
        assert!(selector.matches(&labels(&[("tier", "edge")])));
        assert!(!selector.matches(&labels(&[("tier", "edge"), ("legacy", "1")])));
        assert!(!selector.matches(&labels(&[("tier", "access")])));

        let not_in = LabelSelector::default().with_expression("tier", SelectorOperator::NotIn, vec!["core".into()]);
        assert!(not_in.matches(&Labels::new()));
        assert!(!not_in.matches(&labels(&[("tier", "core")])));
    }

    #[test]
    fn test_validate_operator_values() {
        assert!(LabelSelector::default()
            .with_expression("a", SelectorOperator::In, vec![])
            .validate()
            .is_err());
        assert!(LabelSelector::default()
            .with_expression("a", SelectorOperator::Exists, vec!["x".into()])
            .validate()
            .is_err());
        assert!(LabelSelector::default()
            .with_expression("a", SelectorOperator::Exists, vec![])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_user_labels_strips_system_keys() {
        let all = labels(&[(LABEL_CLAIM_NAME, "c1"), ("site", "ams")]);
        assert_eq!(user_labels(&all), labels(&[("site", "ams")]));
    }
}
