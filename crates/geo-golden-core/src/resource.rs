//! Resources and the resource catalog.
//!
//! A resource is a named, categorized file reference usable inside a command
//! template as `{CATEGORY:id}`. The catalog is loaded once per run from three
//! optional declarative lists in the environment root.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Resource category, as used in command tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceCategory {
    /// Source input product
    Src,
    /// Auxiliary data
    Aux,
    /// Processing graph or recipe
    Gph,
}

impl ResourceCategory {
    /// All categories, in catalog file order.
    pub const ALL: [ResourceCategory; 3] = [
        ResourceCategory::Src,
        ResourceCategory::Aux,
        ResourceCategory::Gph,
    ];

    /// Token spelling of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Src => "SRC",
            ResourceCategory::Aux => "AUX",
            ResourceCategory::Gph => "GPH",
        }
    }

    /// Catalog file holding resources of this category.
    pub fn catalog_file(&self) -> &'static str {
        match self {
            ResourceCategory::Src => "source-products.json",
            ResourceCategory::Aux => "auxiliary-data.json",
            ResourceCategory::Gph => "test-graphs.json",
        }
    }
}

impl FromStr for ResourceCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SRC" => Ok(ResourceCategory::Src),
            "AUX" => Ok(ResourceCategory::Aux),
            "GPH" => Ok(ResourceCategory::Gph),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named file reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resource {
    /// Identifier, unique within its category
    pub id: String,
    /// Category; implied by the catalog file it was loaded from
    pub category: ResourceCategory,
    /// Path, absolute or relative to the environment root
    pub path: String,
    /// Optional human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource {
    /// Resolve the resource path against the environment root.
    ///
    /// Resolution happens at consumption time; the stored path is left as written.
    pub fn absolute_path(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

/// On-disk shape of a catalog entry; the category comes from the file.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: String,
    path: String,
    #[serde(default)]
    description: Option<String>,
}

/// Maps `(category, id)` to resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    entries: HashMap<ResourceCategory, BTreeMap<String, Resource>>,
}

impl ResourceCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all catalog files from an environment root.
    ///
    /// Each file is optional; a missing file yields an empty category.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let mut catalog = Self::new();
        for category in ResourceCategory::ALL {
            let file = root.join(category.catalog_file());
            if !file.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&file)?;
            let entries: Vec<CatalogEntry> = serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("malformed resource list {}: {e}", file.display()))
            })?;
            for entry in entries {
                catalog.insert(Resource {
                    id: entry.id,
                    category,
                    path: entry.path,
                    description: entry.description,
                })?;
            }
        }
        Ok(catalog)
    }

    /// Add a resource, rejecting a second resource with the same key.
    pub fn insert(&mut self, resource: Resource) -> Result<()> {
        let map = self.entries.entry(resource.category).or_default();
        if map.contains_key(&resource.id) {
            return Err(Error::Config(format!(
                "duplicate resource id {}:{}",
                resource.category, resource.id
            )));
        }
        map.insert(resource.id.clone(), resource);
        Ok(())
    }

    /// Look up a resource by category and id.
    pub fn resolve(&self, category: ResourceCategory, id: &str) -> Result<&Resource> {
        self.entries
            .get(&category)
            .and_then(|map| map.get(id))
            .ok_or_else(|| Error::UnknownResource {
                category,
                id: id.to_string(),
            })
    }

    /// Look up a resource using the textual category token.
    pub fn resolve_token(&self, category: &str, id: &str) -> Result<&Resource> {
        self.resolve(category.parse()?, id)
    }

    /// Resources of one category, ordered by id.
    pub fn resources(&self, category: ResourceCategory) -> impl Iterator<Item = &Resource> {
        self.entries
            .get(&category)
            .into_iter()
            .flat_map(|map| map.values())
    }

    /// Total number of resources across all categories.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether the catalog holds no resources.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
