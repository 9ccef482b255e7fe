// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Numeric domains, aligned id blocks and inclusive id ranges.

use crate::{IdError, IdResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Numeric domain of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Id16,
    Id32,
    Id48,
    Id64,
    /// 802.1Q VLAN id space (0..=4095)
    Vlan,
    /// EVPN ESI local discriminator (3 bytes)
    Esi,
}

impl IdType {
    pub const ALL: [IdType; 6] = [
        IdType::Id16,
        IdType::Id32,
        IdType::Id48,
        IdType::Id64,
        IdType::Vlan,
        IdType::Esi,
    ];

    /// Bit width of the domain
    pub const fn bits(self) -> u8 {
        match self {
            IdType::Id16 => 16,
            IdType::Id32 => 32,
            IdType::Id48 => 48,
            IdType::Id64 => 64,
            IdType::Vlan => 12,
            IdType::Esi => 24,
        }
    }

    /// Largest id of the domain
    pub const fn max(self) -> u64 {
        let bits = self.bits();
        if bits == 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    pub const fn contains(self, id: u64) -> bool {
        id <= self.max()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IdType::Id16 => "id16",
            IdType::Id32 => "id32",
            IdType::Id48 => "id48",
            IdType::Id64 => "id64",
            IdType::Vlan => "vlan",
            IdType::Esi => "esi",
        }
    }
}

impl Display for IdType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| IdError::InvalidIndex(format!("unknown id type '{}'", s)))
    }
}

/// Parse a decimal id. Signs, whitespace and empty strings are rejected.
pub fn parse_id(s: &str) -> IdResult<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdError::InvalidClaim(format!("'{}' is not a decimal id", s)));
    }
    s.parse::<u64>()
        .map_err(|e| IdError::InvalidClaim(format!("'{}' is not a valid id: {}", s, e)))
}

/// An aligned block of `2^size_bits` consecutive ids starting at `start`.
///
/// `size_bits == 0` is a single id. Blocks order by start, then size, which
/// keeps every block nested inside `[start, end]` contiguous in a `BTreeMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdBlock {
    start: u64,
    size_bits: u8,
}

impl IdBlock {
    pub fn new(start: u64, size_bits: u8) -> IdResult<Self> {
        if size_bits > 64 {
            return Err(IdError::InvalidClaim(format!("block size 2^{} exceeds 64 bits", size_bits)));
        }
        if size_bits < 64 && start & ((1u64 << size_bits) - 1) != 0 {
            return Err(IdError::InvalidClaim(format!(
                "block start {} is not aligned to 2^{}",
                start, size_bits
            )));
        }
        if size_bits == 64 && start != 0 {
            return Err(IdError::InvalidClaim(format!("block start {} is not aligned to 2^64", start)));
        }
        Ok(Self { start, size_bits })
    }

    pub const fn single(id: u64) -> Self {
        Self { start: id, size_bits: 0 }
    }

    /// The aligned block of `2^size_bits` ids that contains `id`
    pub const fn containing(id: u64, size_bits: u8) -> Self {
        let start = if size_bits >= 64 { 0 } else { id & !((1u64 << size_bits) - 1) };
        Self { start, size_bits }
    }

    pub const fn start(&self) -> u64 {
        self.start
    }

    pub const fn size_bits(&self) -> u8 {
        self.size_bits
    }

    pub const fn is_single(&self) -> bool {
        self.size_bits == 0
    }

    /// Number of ids in the block
    pub const fn len(&self) -> u128 {
        1u128 << self.size_bits
    }

    pub const fn end(&self) -> u64 {
        (self.start as u128 + self.len() - 1) as u64
    }

    pub const fn contains_id(&self, id: u64) -> bool {
        id >= self.start && id <= self.end()
    }

    /// True if `other` lies inside this block and is strictly smaller
    pub const fn strictly_contains(&self, other: &IdBlock) -> bool {
        other.size_bits < self.size_bits && self.contains_id(other.start)
    }

    pub fn overlaps(&self, other: &IdBlock) -> bool {
        self.start <= other.end() && other.start <= self.end()
    }

    /// Parse the entry string form produced by `Display`
    pub fn parse(s: &str) -> IdResult<Self> {
        match s.split_once('-') {
            None => Ok(Self::single(parse_id(s)?)),
            Some(_) => {
                let range: IdRange = s.parse()?;
                let blocks = range.blocks();
                match blocks.as_slice() {
                    [block] => Ok(*block),
                    _ => Err(IdError::InvalidClaim(format!("'{}' is not an aligned block", s))),
                }
            }
        }
    }
}

impl Display for IdBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end())
        }
    }
}

/// Inclusive id range, encoded as `"<start>-<end>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdRange {
    from: u64,
    to: u64,
}

impl IdRange {
    pub fn new(from: u64, to: u64) -> IdResult<Self> {
        if from > to {
            return Err(IdError::InvalidClaim(format!(
                "range start {} is greater than end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    pub const fn from(&self) -> u64 {
        self.from
    }

    pub const fn to(&self) -> u64 {
        self.to
    }

    pub const fn len(&self) -> u128 {
        self.to as u128 - self.from as u128 + 1
    }

    pub const fn contains(&self, id: u64) -> bool {
        id >= self.from && id <= self.to
    }

    /// Decompose into the minimal ordered list of aligned blocks
    pub fn blocks(&self) -> Vec<IdBlock> {
        let mut blocks = Vec::new();
        let end = self.to as u128;
        let mut cursor = self.from as u128;
        while cursor <= end {
            let mut size_bits = cursor.trailing_zeros().min(64);
            while size_bits > 0 && cursor + (1u128 << size_bits) - 1 > end {
                size_bits -= 1;
            }
            blocks.push(IdBlock {
                start: cursor as u64,
                size_bits: size_bits as u8,
            });
            cursor += 1u128 << size_bits;
        }
        blocks
    }

    pub fn check_within(&self, id_type: IdType) -> IdResult<()> {
        if self.to > id_type.max() {
            return Err(IdError::InvalidClaim(format!(
                "range {} exceeds {} maximum {}",
                self,
                id_type,
                id_type.max()
            )));
        }
        Ok(())
    }
}

impl Display for IdRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for IdRange {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('-')
            .ok_or_else(|| IdError::InvalidClaim(format!("range '{}' must be <start>-<end>", s)))?;
        IdRange::new(parse_id(from)?, parse_id(to)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_id_type_bounds() {
        assert_eq!(IdType::Id16.max(), 65_535);
        assert_eq!(IdType::Vlan.max(), 4_095);
        assert_eq!(IdType::Esi.max(), 16_777_215);
        assert_eq!(IdType::Id64.max(), u64::MAX);
        assert!(!IdType::Vlan.contains(4_096));
        assert_eq!("id48".parse::<IdType>().unwrap(), IdType::Id48);
        assert!("id128".parse::<IdType>().is_err());
    }

    #[test]
    fn test_parse_id_rejects_non_digits() {
        assert_eq!(parse_id("100").unwrap(), 100);
        assert!(parse_id("").is_err());
        assert!(parse_id("+1").is_err());
        assert!(parse_id(" 1").is_err());
        assert!(parse_id("18446744073709551616").is_err());
    }

    #[test]
    fn test_range_parsing() {
        let range: IdRange = "10-19".parse().unwrap();
        assert_eq!(range.from(), 10);
        assert_eq!(range.to(), 19);
        assert_eq!(range.to_string(), "10-19");
        assert!("19-10".parse::<IdRange>().is_err());
        assert!("10 - 19".parse::<IdRange>().is_err());
        assert!("10".parse::<IdRange>().is_err());
        assert!("10-".parse::<IdRange>().is_err());
    }

    #[test]
    fn test_range_blocks() {
        let range: IdRange = "10-19".parse().unwrap();
        let blocks: Vec<String> = range.blocks().iter().map(|b| b.to_string()).collect();
        assert_eq!(blocks, vec!["10-11", "12-15", "16-19"]);

        let range: IdRange = "11-19".parse().unwrap();
        let blocks: Vec<String> = range.blocks().iter().map(|b| b.to_string()).collect();
        assert_eq!(blocks, vec!["11", "12-15", "16-19"]);
    }

    #[test]
    fn test_full_64bit_range_is_one_block() {
        let range = IdRange::new(0, u64::MAX).unwrap();
        let blocks = range.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].size_bits(), 64);
        assert_eq!(blocks[0].end(), u64::MAX);
    }

    #[test]
    fn test_block_alignment_and_containment() {
        assert!(IdBlock::new(10, 1).is_ok());
        assert!(IdBlock::new(10, 2).is_err());
        let parent = IdBlock::containing(13, 2);
        assert_eq!(parent.start(), 12);
        assert!(parent.strictly_contains(&IdBlock::single(13)));
        assert!(!parent.strictly_contains(&parent));
        assert_eq!(IdBlock::parse("12-15").unwrap(), parent);
        assert_eq!(IdBlock::parse("7").unwrap(), IdBlock::single(7));
        assert!(IdBlock::parse("11-15").is_err());
    }

    proptest! {
        #[test]
        fn prop_blocks_tile_range(from in 0u64..100_000, span in 0u64..5_000) {
            let range = IdRange::new(from, from + span).unwrap();
            let blocks = range.blocks();
            let mut cursor = from as u128;
            for block in &blocks {
                prop_assert_eq!(block.start() as u128, cursor);
                prop_assert!(IdBlock::new(block.start(), block.size_bits()).is_ok());
                cursor = block.end() as u128 + 1;
            }
            prop_assert_eq!(cursor, (from + span) as u128 + 1);
        }
    }
}
