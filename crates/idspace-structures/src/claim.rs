// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Claims: requests for a static id, a range, or any free id of an index.

use crate::id::{parse_id, IdRange};
use crate::index::{is_reserved_range, IdIndex, IndexKey, INDEX_OWNER_KIND};
use crate::labels::*;
use crate::{IdError, IdResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Claim variant, derived from which request fields are populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimType {
    #[serde(rename = "invalid")]
    Invalid,
    #[serde(rename = "staticID")]
    StaticId,
    #[serde(rename = "dynamicID")]
    DynamicId,
    #[serde(rename = "range")]
    Range,
}

impl ClaimType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimType::Invalid => "invalid",
            ClaimType::StaticId => "staticID",
            ClaimType::DynamicId => "dynamicID",
            ClaimType::Range => "range",
        }
    }
}

impl Display for ClaimType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staticID" => Ok(ClaimType::StaticId),
            "dynamicID" => Ok(ClaimType::DynamicId),
            "range" => Ok(ClaimType::Range),
            "invalid" => Ok(ClaimType::Invalid),
            other => Err(IdError::InvalidClaim(format!("unknown claim type '{}'", other))),
        }
    }
}

/// Reference to the object that owns a claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Owner of a claim: an external object, or the system itself (UID-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClaimOwner {
    Object(ObjectReference),
    Internal { kind: String },
}

impl ClaimOwner {
    pub fn kind(&self) -> &str {
        match self {
            ClaimOwner::Object(obj) => &obj.kind,
            ClaimOwner::Internal { kind } => kind,
        }
    }

    /// Rebuild the owner from slot labels
    pub fn from_labels(labels: &Labels) -> Option<Self> {
        let kind = labels.get(LABEL_OWNER_KIND)?.clone();
        match labels.get(LABEL_OWNER_NAME) {
            Some(name) => Some(ClaimOwner::Object(ObjectReference {
                group: labels.get(LABEL_OWNER_GROUP).cloned().unwrap_or_default(),
                version: labels.get(LABEL_OWNER_VERSION).cloned().unwrap_or_default(),
                kind,
                namespace: labels.get(LABEL_OWNER_NAMESPACE).cloned().unwrap_or_default(),
                name: name.clone(),
            })),
            None => Some(ClaimOwner::Internal { kind }),
        }
    }
}

impl Display for ClaimOwner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimOwner::Object(o) => write!(f, "{}/{}/{}", o.kind, o.namespace, o.name),
            ClaimOwner::Internal { kind } => write!(f, "{}(internal)", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    #[default]
    Pending,
    Ready,
    Failed,
}

/// Readiness condition of a claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub ready: bool,
    pub reason: ConditionReason,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Allocation result mirrored back onto the claim
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default)]
    pub condition: Condition,
}

/// Request against an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdClaim {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    /// Name of the target index (same namespace)
    pub index: String,
    /// Static id request, decimal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Range request, `"<start>-<end>"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    pub owner: ClaimOwner,
    #[serde(default)]
    pub labels: Labels,
    /// Parent range selector, dynamic claims only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(default)]
    pub status: ClaimStatus,
}

impl IdClaim {
    /// New dynamic claim; use the `with_*` builders to turn it into a static or range claim
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        index: impl Into<String>,
        owner: ClaimOwner,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uuid::Uuid::new_v4().to_string(),
            index: index.into(),
            id: None,
            range: None,
            owner,
            labels: Labels::new(),
            selector: None,
            status: ClaimStatus::default(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn claim_type(&self) -> ClaimType {
        match (&self.id, &self.range) {
            (Some(_), Some(_)) => ClaimType::Invalid,
            (Some(_), None) => ClaimType::StaticId,
            (None, Some(_)) => ClaimType::Range,
            (None, None) => ClaimType::DynamicId,
        }
    }

    pub fn index_key(&self) -> IndexKey {
        IndexKey::new(self.namespace.clone(), self.index.clone())
    }

    pub fn static_id(&self) -> IdResult<u64> {
        match &self.id {
            Some(id) => parse_id(id),
            None => Err(IdError::InvalidClaim(format!("claim '{}' has no static id", self.name))),
        }
    }

    pub fn requested_range(&self) -> IdResult<IdRange> {
        match &self.range {
            Some(range) => range.parse(),
            None => Err(IdError::InvalidClaim(format!("claim '{}' has no range", self.name))),
        }
    }

    /// Previously allocated id, if the status carries a parseable one
    pub fn status_id(&self) -> Option<u64> {
        self.status.id.as_deref().and_then(|id| parse_id(id).ok())
    }

    /// Syntax checks against the target index; runs before any mutation
    pub fn validate_syntax(&self, index: &IdIndex) -> IdResult<()> {
        if self.name.is_empty() {
            return Err(IdError::InvalidClaim("claim name cannot be empty".to_string()));
        }
        if self.index != index.name || self.namespace != index.namespace {
            return Err(IdError::InvalidClaim(format!(
                "claim '{}' targets index '{}/{}', not '{}'",
                self.name,
                self.namespace,
                self.index,
                index.key()
            )));
        }
        if let Some(key) = self.labels.keys().find(|k| is_system_label(k)) {
            return Err(IdError::InvalidClaim(format!(
                "label '{}' uses the reserved prefix {}",
                key, LABEL_PREFIX
            )));
        }
        if is_reserved_range(&index.name, &self.name) && !self.is_index_owned() {
            return Err(IdError::InvalidClaim(format!(
                "claim name '{}' is reserved for the bounds of index '{}'",
                self.name,
                index.key()
            )));
        }
        if let Some(selector) = &self.selector {
            selector.validate()?;
        }
        match self.claim_type() {
            ClaimType::Invalid => Err(IdError::InvalidClaimType(self.name.clone())),
            ClaimType::StaticId => {
                let id = self.static_id()?;
                if !index.id_type.contains(id) {
                    return Err(IdError::InvalidClaim(format!(
                        "id {} exceeds {} maximum {}",
                        id,
                        index.id_type,
                        index.max()
                    )));
                }
                Ok(())
            }
            ClaimType::Range => {
                let range = self.requested_range()?;
                range.check_within(index.id_type)?;
                if self.name == index.name {
                    return Err(IdError::InvalidClaim(format!(
                        "range name '{}' must differ from its index name",
                        self.name
                    )));
                }
                Ok(())
            }
            ClaimType::DynamicId => Ok(()),
        }
    }

    /// True for the synthetic claims an index creates for itself
    pub fn is_index_owned(&self) -> bool {
        matches!(&self.owner, ClaimOwner::Internal { kind } if kind == INDEX_OWNER_KIND)
    }

    /// Labels stamped on every slot this claim occupies
    pub fn slot_labels(&self) -> Labels {
        let mut labels = self.labels.clone();
        labels.insert(LABEL_CLAIM_NAME.to_string(), self.name.clone());
        labels.insert(LABEL_CLAIM_UID.to_string(), self.uid.clone());
        labels.insert(LABEL_CLAIM_TYPE.to_string(), self.claim_type().to_string());
        labels.insert(LABEL_OWNER_KIND.to_string(), self.owner.kind().to_string());
        if let ClaimOwner::Object(obj) = &self.owner {
            labels.insert(LABEL_OWNER_GROUP.to_string(), obj.group.clone());
            labels.insert(LABEL_OWNER_VERSION.to_string(), obj.version.clone());
            labels.insert(LABEL_OWNER_NAMESPACE.to_string(), obj.namespace.clone());
            labels.insert(LABEL_OWNER_NAME.to_string(), obj.name.clone());
        }
        labels
    }

    /// Equality selector matching the slots this claim currently owns
    pub fn owner_selector(&self) -> LabelSelector {
        let selector = LabelSelector::default().with_label(LABEL_CLAIM_NAME, self.name.clone());
        match &self.owner {
            ClaimOwner::Object(obj) => selector
                .with_label(LABEL_OWNER_GROUP, obj.group.clone())
                .with_label(LABEL_OWNER_VERSION, obj.version.clone())
                .with_label(LABEL_OWNER_KIND, obj.kind.clone())
                .with_label(LABEL_OWNER_NAMESPACE, obj.namespace.clone())
                .with_label(LABEL_OWNER_NAME, obj.name.clone()),
            ClaimOwner::Internal { kind } => selector
                .with_label(LABEL_CLAIM_UID, self.uid.clone())
                .with_label(LABEL_OWNER_KIND, kind.clone()),
        }
    }

    pub fn set_ready_id(&mut self, id: impl Into<String>) {
        self.status.id = Some(id.into());
        self.status.range = None;
        self.status.condition = Condition {
            ready: true,
            reason: ConditionReason::Ready,
            message: String::new(),
        };
    }

    pub fn set_ready_range(&mut self, range: impl Into<String>) {
        self.status.id = None;
        self.status.range = Some(range.into());
        self.status.condition = Condition {
            ready: true,
            reason: ConditionReason::Ready,
            message: String::new(),
        };
    }

    /// Mark not ready; the allocated id/range stays for stability on retry
    pub fn set_failed(&mut self, message: impl Into<String>) {
        self.status.condition = Condition {
            ready: false,
            reason: ConditionReason::Failed,
            message: message.into(),
        };
    }

    /// Back to not-yet-applied; the id/range stays as the preferred allocation
    pub fn set_pending(&mut self, message: impl Into<String>) {
        self.status.condition = Condition {
            ready: false,
            reason: ConditionReason::Pending,
            message: message.into(),
        };
    }

    pub fn is_ready(&self) -> bool {
        self.status.condition.ready
    }
}
