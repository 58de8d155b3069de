// 📇 Catalog Model - Wire types for the creature catalog
// Index entries are references; records are the resolved, immutable entities.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// INDEX
// ============================================================================

/// Lightweight reference to a full record (name + lookup URL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
}

/// One page of the catalog index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Total number of entries the API knows about (not the page size)
    #[serde(default)]
    pub count: Option<u64>,

    #[serde(default)]
    pub results: Vec<CatalogEntry>,
}

/// Limit/offset window requested from the index endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            limit: 151,
            offset: 0,
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Named API resource; only the name is kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

/// `{ "type": { "name": "fire" } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedRef,
}

/// `{ "base_stat": 45 }` - the stat name is implied by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSlot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_stat: i64,
}

/// Fully resolved creature record. Identity is `id`.
///
/// `types` and `stats` default to empty when the payload omits them or sends null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u32,
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub types: Vec<TypeSlot>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: Vec<StatSlot>,
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Record {
    /// Base stat at `index`, 0 when the position is missing
    pub fn stat_at(&self, index: usize) -> i64 {
        self.stats.get(index).map(|s| s.base_stat).unwrap_or(0)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|slot| slot.kind.name.as_str())
    }

    #[cfg(test)]
    pub fn sample(id: u32, name: &str, types: &[&str], stats: &[i64]) -> Self {
        Record {
            id,
            name: name.to_string(),
            types: types
                .iter()
                .map(|t| TypeSlot {
                    kind: NamedRef {
                        name: t.to_string(),
                    },
                })
                .collect(),
            stats: stats
                .iter()
                .map(|&base_stat| StatSlot { base_stat })
                .collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
