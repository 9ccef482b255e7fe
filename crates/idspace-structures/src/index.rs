// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Index definitions and the reserved min/max boundary claims.

use crate::claim::{ClaimOwner, IdClaim};
use crate::id::{IdRange, IdType};
use crate::labels::Labels;
use crate::{IdError, IdResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Owner kind of the synthetic claims an index creates for itself
pub const INDEX_OWNER_KIND: &str = "IDIndex";

pub const RESERVED_MIN_SUFFIX: &str = "rangeReservedMin";
pub const RESERVED_MAX_SUFFIX: &str = "rangeReservedMax";

/// Namespace + name of an index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexKey {
    pub namespace: String,
    pub name: String,
}

impl IndexKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for IndexKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub fn reserved_min_name(index: &str) -> String {
    format!("{}.{}", index, RESERVED_MIN_SUFFIX)
}

pub fn reserved_max_name(index: &str) -> String {
    format!("{}.{}", index, RESERVED_MAX_SUFFIX)
}

/// True if `name` is one of the two reserved boundary ranges of `index`
pub fn is_reserved_range(index: &str, name: &str) -> bool {
    name == reserved_min_name(index) || name == reserved_max_name(index)
}

/// A bounded numeric domain instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdIndex {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub id_type: IdType,
    /// Lowest id user claims may land on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_id: Option<u64>,
    /// Highest id user claims may land on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_id: Option<u64>,
    #[serde(default)]
    pub labels: Labels,
}

impl IdIndex {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, id_type: IdType) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uuid::Uuid::new_v4().to_string(),
            id_type,
            min_id: None,
            max_id: None,
            labels: Labels::new(),
        }
    }

    pub fn with_bounds(mut self, min_id: Option<u64>, max_id: Option<u64>) -> Self {
        self.min_id = min_id;
        self.max_id = max_id;
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn key(&self) -> IndexKey {
        IndexKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn max(&self) -> u64 {
        self.id_type.max()
    }

    pub fn validate(&self) -> IdResult<()> {
        if self.name.is_empty() {
            return Err(IdError::InvalidIndex("index name cannot be empty".to_string()));
        }
        if self.uid.is_empty() {
            return Err(IdError::InvalidIndex(format!("index '{}' has no uid", self.name)));
        }
        for (field, bound) in [("minID", self.min_id), ("maxID", self.max_id)] {
            if let Some(v) = bound {
                if !self.id_type.contains(v) {
                    return Err(IdError::InvalidIndex(format!(
                        "{} {} exceeds {} maximum {}",
                        field,
                        v,
                        self.id_type,
                        self.max()
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_id, self.max_id) {
            if min > max {
                return Err(IdError::InvalidIndex(format!(
                    "minID {} is greater than maxID {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Span withdrawn below `min_id`, if any
    pub fn reserved_min_range(&self) -> Option<IdRange> {
        match self.min_id {
            Some(min) if min > 0 => IdRange::new(0, min - 1).ok(),
            _ => None,
        }
    }

    /// Span withdrawn above `max_id`, if any
    pub fn reserved_max_range(&self) -> Option<IdRange> {
        match self.max_id {
            Some(max) if max < self.max() => IdRange::new(max + 1, self.max()).ok(),
            _ => None,
        }
    }

    /// Synthetic boundary claim, owned by this index through its uid
    pub fn reserved_claim(&self, name: String, range: Option<IdRange>) -> IdClaim {
        let claim = IdClaim::new(
            self.namespace.clone(),
            name,
            self.name.clone(),
            ClaimOwner::Internal {
                kind: INDEX_OWNER_KIND.to_string(),
            },
        )
        .with_uid(self.uid.clone());
        match range {
            Some(range) => claim.with_range(range.to_string()),
            None => claim,
        }
    }

    /// The (min, max) boundary claims as `(name, desired)` pairs; `None` when
    /// the bound does not withdraw anything
    pub fn reserved_claims(&self) -> [(String, Option<IdClaim>); 2] {
        let min_name = reserved_min_name(&self.name);
        let max_name = reserved_max_name(&self.name);
        [
            (
                min_name.clone(),
                self.reserved_min_range()
                    .map(|r| self.reserved_claim(min_name, Some(r))),
            ),
            (
                max_name.clone(),
                self.reserved_max_range()
                    .map(|r| self.reserved_claim(max_name, Some(r))),
            ),
        ]
    }
}
