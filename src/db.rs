//! Database schema and operations

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use num_bigint::BigInt;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::catalog::Catalog;
use crate::models::{Item, ItemId, Recipe};
use crate::rational::Rational;
use crate::table::ValueTable;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Item catalog supplied by the host game and its mods
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            market_value INTEGER NOT NULL DEFAULT 0,
            namespace TEXT
        );

        -- Crafting recipes: inputs -> output_quantity x output
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            output_id INTEGER NOT NULL,
            output_quantity INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_inputs (
            recipe_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            item_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, position)
        );

        -- Last published value table. Stored as decimal text so large
        -- numerators and denominators survive.
        CREATE TABLE IF NOT EXISTS emc_values (
            item_id INTEGER PRIMARY KEY,
            numerator TEXT NOT NULL,
            denominator TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_output ON recipes(output_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_item ON recipe_inputs(item_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    let market_value = i64::try_from(item.market_value)
        .with_context(|| format!("Market value of item {} is out of range", item.id))?;
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name, market_value, namespace)
         VALUES (?1, ?2, ?3, ?4)",
        (item.id.0, &item.name, market_value, &item.namespace),
    )?;
    Ok(())
}

/// Insert a recipe with its ingredients, returning the recipe row id
pub fn insert_recipe(conn: &Connection, recipe: &Recipe) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO recipes (output_id, output_quantity) VALUES (?1, ?2)",
        (recipe.output().0, recipe.output_quantity().get()),
    )?;
    let recipe_id = tx.last_insert_rowid();

    for (position, input) in recipe.inputs().iter().enumerate() {
        tx.execute(
            "INSERT INTO recipe_inputs (recipe_id, position, item_id, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (recipe_id, position as i64, input.item.0, input.quantity.get()),
        )?;
    }
    tx.commit()?;
    Ok(recipe_id)
}

/// Clear the catalog and any stored values (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM emc_values;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

type ItemRow = (i32, String, i64, Option<String>);

fn read_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn item_from_row((id, name, market_value, namespace): ItemRow) -> Result<Item> {
    let market_value = u64::try_from(market_value)
        .with_context(|| format!("Item {} has a negative market value", id))?;
    Ok(Item {
        id: ItemId(id),
        name,
        market_value,
        namespace,
    })
}

/// List all items ordered by id
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare("SELECT id, name, market_value, namespace FROM items ORDER BY id")?;

    let rows = stmt.query_map([], read_item_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(item_from_row(row?)?);
    }
    Ok(results)
}

/// Look up a single item
pub fn get_item(conn: &Connection, id: ItemId) -> Result<Option<Item>> {
    let row = conn
        .query_row(
            "SELECT id, name, market_value, namespace FROM items WHERE id = ?1",
            [id.0],
            read_item_row,
        )
        .optional()?;

    row.map(item_from_row).transpose()
}

/// Load the full catalog snapshot
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    catalog.extend(list_items(conn)?);

    let mut stmt = conn.prepare(
        "SELECT r.id, r.output_id, r.output_quantity, ri.item_id, ri.quantity
         FROM recipes r
         JOIN recipe_inputs ri ON ri.recipe_id = r.id
         ORDER BY r.id, ri.position",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i32>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, i32>(3)?,
            row.get::<_, u32>(4)?,
        ))
    })?;

    let mut grouped: BTreeMap<i64, (i32, u32, Vec<(ItemId, u32)>)> = BTreeMap::new();
    for row in rows {
        let (recipe_id, output, output_quantity, item, quantity) = row?;
        grouped
            .entry(recipe_id)
            .or_insert_with(|| (output, output_quantity, Vec::new()))
            .2
            .push((ItemId(item), quantity));
    }

    for (recipe_id, (output, output_quantity, inputs)) in grouped {
        let recipe = Recipe::new(ItemId(output), output_quantity, inputs)
            .with_context(|| format!("Recipe {} is invalid", recipe_id))?;
        catalog.add_recipe(recipe);
    }

    Ok(catalog)
}

/// Replace the stored value table with a new snapshot
pub fn store_values(conn: &Connection, table: &ValueTable) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM emc_values", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO emc_values (item_id, numerator, denominator) VALUES (?1, ?2, ?3)",
        )?;
        for (id, value) in table.iter() {
            stmt.execute((id.0, value.numer().to_string(), value.denom().to_string()))?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// Load the stored value table
pub fn load_values(conn: &Connection) -> Result<ValueTable> {
    let mut stmt =
        conn.prepare("SELECT item_id, numerator, denominator FROM emc_values ORDER BY item_id")?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut values = Vec::new();
    for row in rows {
        let (id, numer, denom) = row?;
        values.push((ItemId(id), parse_value(id, &numer, &denom)?));
    }
    Ok(values.into_iter().collect())
}

/// Look up a single stored value
pub fn get_value(conn: &Connection, id: ItemId) -> Result<Option<Rational>> {
    let row = conn
        .query_row(
            "SELECT numerator, denominator FROM emc_values WHERE item_id = ?1",
            [id.0],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;

    row.map(|(numer, denom)| parse_value(id.0, &numer, &denom))
        .transpose()
}

fn parse_value(id: i32, numer: &str, denom: &str) -> Result<Rational> {
    let numer = BigInt::from_str(numer)
        .with_context(|| format!("Bad stored numerator for item {}: {}", id, numer))?;
    let denom = BigInt::from_str(denom)
        .with_context(|| format!("Bad stored denominator for item {}: {}", id, denom))?;
    Rational::new(numer, denom).with_context(|| format!("Bad stored value for item {}", id))
}
