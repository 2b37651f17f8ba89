//! Typed access to the static configuration tables.
//!
//! The caches only need one question answered per record kind ("which
//! backpack type does item X belong to", "which chapter holds stage Y").
//! [`ConfigTables`] answers both from rows loaded out of JSON files.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{BackpackTypeId, ChapterId, ItemId, StageId};

pub const ITEM_TABLE: &str = "item.json";
pub const STAGE_TABLE: &str = "stage.json";
pub const BACKPACK_TYPE_TABLE: &str = "backpack_type.json";

pub trait ItemGroupLookup: Send + Sync {
    fn backpack_type_of(&self, item_id: ItemId) -> Option<BackpackTypeId>;
}

pub trait StageGroupLookup: Send + Sync {
    fn chapter_of(&self, stage_id: StageId) -> Option<ChapterId>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConfig {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quality: i32,
    pub backpack_type_id: BackpackTypeId,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConfig {
    pub id: StageId,
    #[serde(default)]
    pub stage_name: String,
    #[serde(default)]
    pub stage_type: i32,
    #[serde(default)]
    pub difficulty: i32,
    pub chapter: ChapterId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackpackTypeConfig {
    pub id: BackpackTypeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read config table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config table {table}: {source}")]
    Parse {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory configuration tables keyed by primary id.
#[derive(Debug, Clone, Default)]
pub struct ConfigTables {
    items: HashMap<ItemId, ItemConfig>,
    stages: HashMap<StageId, StageConfig>,
    backpack_types: HashMap<BackpackTypeId, BackpackTypeConfig>,
}

impl ConfigTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(
        items: impl IntoIterator<Item = ItemConfig>,
        stages: impl IntoIterator<Item = StageConfig>,
        backpack_types: impl IntoIterator<Item = BackpackTypeConfig>,
    ) -> Self {
        Self {
            items: index(items, |row| row.id),
            stages: index(stages, |row| row.id),
            backpack_types: index(backpack_types, |row| row.id),
        }
    }

    /// Builds the tables from JSON arrays. `None` leaves a table empty.
    pub fn from_json(
        items: Option<&str>,
        stages: Option<&str>,
        backpack_types: Option<&str>,
    ) -> Result<Self, LookupError> {
        Ok(Self::from_rows(
            parse_rows::<ItemConfig>(ITEM_TABLE, items)?,
            parse_rows::<StageConfig>(STAGE_TABLE, stages)?,
            parse_rows::<BackpackTypeConfig>(BACKPACK_TYPE_TABLE, backpack_types)?,
        ))
    }

    /// Loads `item.json`, `stage.json` and `backpack_type.json` from `dir`.
    /// Missing files yield empty tables; unreadable or malformed files are errors.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, LookupError> {
        let dir = dir.as_ref();
        let items = read_optional(&dir.join(ITEM_TABLE))?;
        let stages = read_optional(&dir.join(STAGE_TABLE))?;
        let backpack_types = read_optional(&dir.join(BACKPACK_TYPE_TABLE))?;
        let tables = Self::from_json(items.as_deref(), stages.as_deref(), backpack_types.as_deref())?;
        debug!(
            dir = %dir.display(),
            items = tables.items.len(),
            stages = tables.stages.len(),
            backpack_types = tables.backpack_types.len(),
            "config tables loaded"
        );
        Ok(tables)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemConfig> {
        self.items.get(&id)
    }

    pub fn stage(&self, id: StageId) -> Option<&StageConfig> {
        self.stages.get(&id)
    }

    pub fn backpack_type(&self, id: BackpackTypeId) -> Option<&BackpackTypeConfig> {
        self.backpack_types.get(&id)
    }

    /// Backpack types ordered for display.
    pub fn backpack_types_sorted(&self) -> Vec<&BackpackTypeConfig> {
        let mut types: Vec<_> = self.backpack_types.values().collect();
        types.sort_by_key(|t| (t.sort_order, t.id));
        types
    }
}

impl ItemGroupLookup for ConfigTables {
    fn backpack_type_of(&self, item_id: ItemId) -> Option<BackpackTypeId> {
        self.items.get(&item_id).map(|row| row.backpack_type_id)
    }
}

impl StageGroupLookup for ConfigTables {
    fn chapter_of(&self, stage_id: StageId) -> Option<ChapterId> {
        self.stages.get(&stage_id).map(|row| row.chapter)
    }
}

fn index<K, V>(rows: impl IntoIterator<Item = V>, key: impl Fn(&V) -> K) -> HashMap<K, V>
where
    K: std::hash::Hash + Eq + std::fmt::Debug,
{
    let mut map = HashMap::new();
    for row in rows {
        let id = key(&row);
        if map.contains_key(&id) {
            warn!(?id, "duplicate config row, keeping the last one");
        }
        map.insert(id, row);
    }
    map
}

fn parse_rows<T: serde::de::DeserializeOwned>(table: &str, text: Option<&str>) -> Result<Vec<T>, LookupError> {
    match text {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(text).map_err(|source| LookupError::Parse {
            table: table.to_string(),
            source,
        }),
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, LookupError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "config table missing, using empty table");
            Ok(None)
        }
        Err(source) => Err(LookupError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
