//! EMC Calculator
//!
//! Computes EMC values for a crafting catalog stored in SQLite.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use emc_calculator::models::{Item, ItemId, Recipe};
use emc_calculator::{calculate_values, db, extract, CalculatorConfig};

#[derive(Parser)]
#[command(name = "emc-calculator")]
#[command(about = "EMC value calculator for crafting recipe catalogs")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "emc_data.db")]
    database: PathBuf,

    /// Path to the calculator config (engine settings and overrides)
    #[arg(short, long, default_value = "emc.toml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import items and recipes from a directory of TOML catalog files
    Import {
        /// Path to catalog directory
        source_dir: PathBuf,

        /// Clear existing catalog before import
        #[arg(long)]
        clear: bool,
    },

    /// Calculate EMC values for the whole catalog and store them
    Calc {
        /// Print every computed value
        #[arg(long)]
        show_values: bool,
    },

    /// Show the stored EMC value of one item
    Value {
        /// Item id
        id: i32,

        /// Stack size to price
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },

    /// List all items in the catalog
    ListItems,

    /// List all stored EMC values
    ListValues,

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without a catalog dump)
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "emc_calculator=debug"
    } else {
        "emc_calculator=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { source_dir, clear } => {
            if clear {
                println!("Clearing existing catalog...");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::import_to_database(&conn, &source_dir)?;
            println!("\n{}", stats);
        }

        Commands::Calc { show_values } => {
            let config = CalculatorConfig::load_or_default(&cli.config)?;
            let catalog = db::load_catalog(&conn)?;
            if catalog.item_count() == 0 {
                println!("No items in database. Run 'import' or 'load-sample' first.");
                return Ok(());
            }

            let calculation = calculate_values(&catalog, &config);
            db::store_values(&conn, &calculation.table)?;

            if show_values {
                println!("{:<8} {:<30} {:>16}", "Id", "Item", "EMC");
                println!("{}", "-".repeat(56));
                for (id, value) in calculation.table.iter() {
                    let name = catalog.get(id).map_or("?", |item| item.name.as_str());
                    println!("{:<8} {:<30} {:>16}", id, name, value.to_string());
                }
                println!();
            }

            println!("{}", calculation.summary);
        }

        Commands::Value { id, count } => {
            let id = ItemId(id);
            match db::get_value(&conn, id)? {
                Some(value) => {
                    let name = db::get_item(&conn, id)?
                        .map_or_else(|| "?".to_string(), |item| item.name);
                    println!("Item: {} ({})", name, id);
                    println!("  EMC: {} (~{:.3})", value, value.to_f64());
                    if count > 1 {
                        let stack = value.mul_quantity(count);
                        println!("  Stack of {}: {} (~{:.3})", count, stack, stack.to_f64());
                    }
                }
                None => println!("No EMC value stored for item {}. Run 'calc' first.", id),
            }
        }

        Commands::ListItems => {
            let items = db::list_items(&conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<8} {:<30} {:>12} {}", "Id", "Item", "Value", "Mod");
                println!("{}", "-".repeat(60));
                for item in items {
                    println!(
                        "{:<8} {:<30} {:>12} {}",
                        item.id,
                        item.name,
                        item.market_value,
                        item.namespace.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::ListValues => {
            let values = db::load_values(&conn)?;
            if values.is_empty() {
                println!("No EMC values stored. Run 'calc' first.");
            } else {
                let names: BTreeMap<ItemId, String> = db::list_items(&conn)?
                    .into_iter()
                    .map(|item| (item.id, item.name))
                    .collect();
                println!("{:<8} {:<30} {:>16}", "Id", "Item", "EMC");
                println!("{}", "-".repeat(56));
                for (id, value) in values.iter() {
                    let name = names.get(&id).map_or("?", String::as_str);
                    println!("{:<8} {:<30} {:>16}", id, name, value.to_string());
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Load a small vanilla-style catalog for testing without a catalog dump
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalog(conn)?;

    let items = [
        (1, "Iron Pickaxe", 2000),
        (2, "Dirt Block", 0),
        (3, "Stone Block", 0),
        (8, "Torch", 50),
        (9, "Wood", 0),
        (11, "Iron Ore", 500),
        (12, "Copper Ore", 100),
        (20, "Copper Bar", 300),
        (22, "Iron Bar", 1500),
        (23, "Gel", 1),
        (24, "Wooden Sword", 100),
        (35, "Iron Anvil", 7500),
        (36, "Work Bench", 150),
        (150, "Cobweb", 0),
        (173, "Obsidian", 0),
        (225, "Silk", 1000),
        (3318, "Treasure Bag (King Slime)", 0),
    ];
    for (id, name, value) in items {
        db::upsert_item(conn, &Item::new(ItemId(id), name, value))?;
    }

    // (output, quantity, inputs)
    let recipes: [(i32, u32, &[(i32, u32)]); 8] = [
        (8, 3, &[(9, 1), (23, 1)]),
        (36, 1, &[(9, 10)]),
        (24, 1, &[(9, 7)]),
        (20, 1, &[(12, 3)]),
        (22, 1, &[(11, 3)]),
        (1, 1, &[(22, 12), (9, 3)]),
        (35, 1, &[(22, 5)]),
        (225, 1, &[(150, 7)]),
    ];
    for (output, quantity, inputs) in recipes {
        let recipe = Recipe::new(
            ItemId(output),
            quantity,
            inputs.iter().map(|(id, count)| (ItemId(*id), *count)),
        )?;
        db::insert_recipe(conn, &recipe)?;
    }

    println!("Loaded {} sample items and {} recipes", items.len(), recipes.len());
    Ok(())
}
