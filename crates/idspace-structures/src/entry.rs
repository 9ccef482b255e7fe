// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Durable entries: one record per occupied tree/table slot.

use crate::claim::{ClaimOwner, ClaimType, IdClaim};
use crate::index::IndexKey;
use crate::labels::{user_labels, Labels, LABEL_CLAIM_NAME, LABEL_CLAIM_TYPE, LABEL_CLAIM_UID};
use crate::{IdError, IdResult};
use serde::{Deserialize, Serialize};

/// Materialized record of one allocated slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdEntry {
    pub namespace: String,
    pub name: String,
    /// Owning index name
    pub index: String,
    /// Allocated id or block, string form
    pub id: String,
    pub claim_type: ClaimType,
    pub claim_name: String,
    pub claim_uid: String,
    pub owner: ClaimOwner,
    /// Range table holding the slot; `None` is the main tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_name: Option<String>,
    #[serde(default)]
    pub labels: Labels,
}

impl IdEntry {
    /// Unique per (index, table, id)
    pub fn entry_name(index: &str, range_name: Option<&str>, id: &str) -> String {
        match range_name {
            Some(range) => format!("{}.{}.{}", index, range, id),
            None => format!("{}.{}", index, id),
        }
    }

    /// Build the entry image of a slot from its labels
    pub fn from_slot(
        index: &IndexKey,
        range_name: Option<&str>,
        id: &str,
        slot_labels: &Labels,
    ) -> IdResult<Self> {
        let missing = |key: &str| {
            IdError::Storage(format!(
                "slot {} of index {} has no '{}' label",
                id, index, key
            ))
        };
        let claim_name = slot_labels
            .get(LABEL_CLAIM_NAME)
            .ok_or_else(|| missing(LABEL_CLAIM_NAME))?
            .clone();
        let claim_type = slot_labels
            .get(LABEL_CLAIM_TYPE)
            .ok_or_else(|| missing(LABEL_CLAIM_TYPE))?
            .parse()?;
        let owner = ClaimOwner::from_labels(slot_labels)
            .ok_or_else(|| missing(crate::labels::LABEL_OWNER_KIND))?;
        Ok(Self {
            namespace: index.namespace.clone(),
            name: Self::entry_name(&index.name, range_name, id),
            index: index.name.clone(),
            id: id.to_string(),
            claim_type,
            claim_name,
            claim_uid: slot_labels.get(LABEL_CLAIM_UID).cloned().unwrap_or_default(),
            owner,
            range_name: range_name.map(str::to_string),
            labels: user_labels(slot_labels),
        })
    }

    pub fn index_key(&self) -> IndexKey {
        IndexKey::new(self.namespace.clone(), self.index.clone())
    }

    /// Same owner reference, claim name and type as `claim`
    pub fn is_owned_by(&self, claim: &IdClaim) -> bool {
        if self.claim_name != claim.name || self.owner != claim.owner {
            return false;
        }
        match self.owner {
            ClaimOwner::Internal { .. } => self.claim_uid == claim.uid,
            ClaimOwner::Object(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ObjectReference;

    #[test]
    fn test_from_slot_roundtrips_claim_identity() {
        let owner = ClaimOwner::Object(ObjectReference {
            group: "net.example".into(),
            version: "v1".into(),
            kind: "Interface".into(),
            namespace: "default".into(),
            name: "eth0".into(),
        });
        let mut claim = IdClaim::new("default", "c1", "vlans", owner).with_id(12);
        claim.labels.insert("site".into(), "ams".into());

        let key = IndexKey::new("default", "vlans");
        let entry = IdEntry::from_slot(&key, Some("r1"), "12", &claim.slot_labels()).unwrap();
        assert_eq!(entry.name, "vlans.r1.12");
        assert_eq!(entry.claim_type, ClaimType::StaticId);
        assert_eq!(entry.labels.get("site").map(String::as_str), Some("ams"));
        assert_eq!(entry.labels.len(), 1);
        assert!(entry.is_owned_by(&claim));
        assert_eq!(entry.index_key(), key);
    }

    #[test]
    fn test_from_slot_requires_system_labels() {
        let key = IndexKey::new("default", "vlans");
        assert!(IdEntry::from_slot(&key, None, "1", &Labels::new()).is_err());
    }
}
