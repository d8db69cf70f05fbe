//! Catalog import from TOML data files
//!
//! Walks a directory for `*.toml` files describing items and recipes
//! (as dumped from the host game and its mods) and loads them into the
//! catalog database.
//!
//! ```toml
//! namespace = "Terraria"
//!
//! [[item]]
//! id = 9
//! name = "Wood"
//! value = 0
//!
//! [[recipe]]
//! output = 8
//! quantity = 3
//! inputs = [{ item = 9 }, { item = 23, count = 1 }]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{Item, ItemId, Recipe};

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
struct RawItem {
    id: ItemId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: u64,
    namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawIngredient {
    item: ItemId,
    #[serde(default = "default_count")]
    count: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRecipe {
    output: ItemId,
    #[serde(default = "default_count")]
    quantity: u32,
    #[serde(default)]
    inputs: Vec<RawIngredient>,
}

/// One catalog file. `namespace` applies to items that don't name their own.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawCatalogFile {
    namespace: Option<String>,
    #[serde(default, rename = "item")]
    items: Vec<RawItem>,
    #[serde(default, rename = "recipe")]
    recipes: Vec<RawRecipe>,
}

/// Find all catalog files under a directory, in path order
pub fn find_catalog_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        anyhow::bail!("Catalog directory does not exist: {}", data_dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(data_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();

    Ok(files)
}

fn parse_catalog_file(filepath: &Path) -> Result<RawCatalogFile> {
    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read {}", filepath.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", filepath.display()))
}

/// Import every catalog file under `data_dir` into the database
pub fn import_to_database(conn: &Connection, data_dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    info!("Scanning {} for catalog files...", data_dir.display());
    let files = find_catalog_files(data_dir)?;
    info!("Found {} catalog files", files.len());

    for filepath in &files {
        let file = match parse_catalog_file(filepath) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping {}: {:#}", filepath.display(), e);
                stats.errors += 1;
                continue;
            }
        };
        stats.files += 1;

        for raw in file.items {
            if raw.name.trim().is_empty() {
                debug!("Skipping unnamed item {} in {}", raw.id, filepath.display());
                stats.skipped_items += 1;
                continue;
            }
            let item = Item {
                id: raw.id,
                name: raw.name,
                market_value: raw.value,
                namespace: raw.namespace.or_else(|| file.namespace.clone()),
            };
            db::upsert_item(conn, &item)?;
            stats.items += 1;
        }

        for raw in file.recipes {
            let inputs = raw.inputs.iter().map(|i| (i.item, i.count));
            match Recipe::new(raw.output, raw.quantity, inputs) {
                Ok(recipe) => {
                    db::insert_recipe(conn, &recipe)?;
                    stats.recipes += 1;
                }
                Err(e) => {
                    warn!("Skipping recipe in {}: {}", filepath.display(), e);
                    stats.invalid_recipes += 1;
                }
            }
        }

        info!(
            "  Parsed: {} ({} items, {} recipes so far)",
            filepath.display(),
            stats.items,
            stats.recipes
        );
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub items: usize,
    pub recipes: usize,
    pub skipped_items: usize,
    pub invalid_recipes: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items and {} recipes from {} files. Unnamed items skipped: {}, Invalid recipes: {}, Errors: {}",
            self.items, self.recipes, self.files, self.skipped_items, self.invalid_recipes, self.errors
        )
    }
}
