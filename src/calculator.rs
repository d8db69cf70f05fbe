//! EMC propagation engine
//!
//! Every recipe is read as a linear equation
//! `value(output) * output_qty = sum(value(input) * input_qty)`.
//! Items no recipe produces are seeded from their market value, curated
//! seed overrides are pinned on top, and then the recipe list is swept
//! repeatedly, solving any equation with exactly one unknown, until a full
//! sweep changes nothing. Whatever is still unknown falls back to its
//! market-derived default, and the equivalent overrides are applied last.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::catalog::Catalog;
use crate::config::{CalculatorConfig, EngineSettings};
use crate::models::{Ingredient, ItemId, Recipe};
use crate::overrides::Override;
use crate::rational::Rational;
use crate::table::ValueTable;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Emc {
    Unknown,
    Known(Rational),
}

/// Output of one full calculation run.
#[derive(Debug, Clone)]
pub struct Calculation {
    pub table: ValueTable,
    pub summary: CalculationSummary,
}

/// Calculate EMC values for every item in the catalog.
///
/// Always returns a complete table: unresolved items get their default
/// value and no error is ever surfaced from a normal run.
pub fn calculate_values(catalog: &Catalog, config: &CalculatorConfig) -> Calculation {
    let started = Instant::now();
    info!(
        "Starting EMC calculation over {} items and {} recipes",
        catalog.item_count(),
        catalog.recipe_count()
    );

    let mut solver = Solver::new(catalog, &config.engine);
    let mut summary = CalculationSummary {
        items: catalog.item_count(),
        recipes: catalog.recipe_count(),
        ..Default::default()
    };

    summary.basic_items = solver.seed_basic_items();
    info!("Found {} basic items with no recipes", summary.basic_items);

    summary.seeded = solver.apply_overrides(&config.overrides.seed, "seed");

    let loop_started = Instant::now();
    let relaxation = solver.relax();
    summary.solved = relaxation.solved;
    summary.sweeps = relaxation.sweeps;
    summary.hit_sweep_cap = relaxation.hit_cap;
    info!(
        "EMC calculation stabilized after {} sweeps ({} values solved) in {:?}",
        relaxation.sweeps,
        relaxation.solved,
        loop_started.elapsed()
    );

    summary.fallback = solver.apply_fallback();
    summary.finalized = solver.apply_overrides(&config.overrides.equivalent, "equivalent");

    let table = solver.finish();
    for (id, value) in table.iter() {
        trace!(
            "Item: {} (Type: {}) - EMC: {}",
            catalog.get(id).map_or("Unknown", |item| item.name.as_str()),
            id,
            value
        );
    }

    summary.elapsed = started.elapsed();
    info!("EMC calculation completed in {:?}", summary.elapsed);

    Calculation { table, summary }
}

struct Relaxation {
    sweeps: usize,
    solved: usize,
    hit_cap: bool,
}

struct Solver<'a> {
    catalog: &'a Catalog,
    settings: &'a EngineSettings,
    values: BTreeMap<ItemId, Emc>,
}

impl<'a> Solver<'a> {
    fn new(catalog: &'a Catalog, settings: &'a EngineSettings) -> Self {
        let values = catalog.items().map(|item| (item.id, Emc::Unknown)).collect();
        Self {
            catalog,
            settings,
            values,
        }
    }

    /// `max(minimum_value, market_value / sale_divisor)`
    fn default_value(&self, id: ItemId) -> Rational {
        let market = self.catalog.get(id).map_or(0, |item| item.market_value);
        let value = Rational::from_integer(market).div_quantity(self.settings.sale_divisor);
        value.max(self.settings.minimum())
    }

    fn known(&self, id: ItemId) -> Option<&Rational> {
        match self.values.get(&id) {
            Some(Emc::Known(value)) => Some(value),
            _ => None,
        }
    }

    fn is_unknown(&self, id: ItemId) -> bool {
        matches!(self.values.get(&id), Some(Emc::Unknown))
    }

    fn set(&mut self, id: ItemId, value: Rational) {
        self.values.insert(id, Emc::Known(value));
    }

    fn seed_basic_items(&mut self) -> usize {
        let basic = self.catalog.basic_items();
        for id in &basic {
            let value = self.default_value(*id);
            self.set(*id, value);
        }
        basic.len()
    }

    fn apply_overrides(&mut self, entries: &[Override], phase: &str) -> usize {
        let mut applied = 0;
        for entry in entries {
            if !entry.applies_to(self.catalog) {
                debug!(
                    "Skipping {} override for item {}: not loaded",
                    phase, entry.item
                );
                continue;
            }
            let resolved = entry.resolve(self.catalog, self.settings.sale_divisor, |id| {
                self.known(id).cloned()
            });
            match resolved {
                Some(value) => {
                    debug!("Applying {} override: item {} = {}", phase, entry.item, value);
                    self.set(entry.item, value);
                    applied += 1;
                }
                None => debug!(
                    "Skipping {} override for item {}: source value unavailable",
                    phase, entry.item
                ),
            }
        }
        applied
    }

    /// Sweep until nothing changes or the sweep cap is reached.
    fn relax(&mut self) -> Relaxation {
        let cap = self
            .settings
            .max_sweeps
            .unwrap_or(self.catalog.recipe_count() + 1);
        let mut sweeps = 0;
        let mut solved = 0;

        loop {
            if sweeps >= cap {
                warn!(
                    "EMC relaxation hit the sweep cap ({}); recipe graph may be cyclic, \
                     unresolved items will use defaults",
                    cap
                );
                return Relaxation {
                    sweeps,
                    solved,
                    hit_cap: true,
                };
            }
            sweeps += 1;

            let catalog = self.catalog;
            let mut changed = false;
            for recipe in catalog.recipes() {
                if self.solve(recipe) {
                    solved += 1;
                    changed = true;
                }
            }
            if !changed {
                return Relaxation {
                    sweeps,
                    solved,
                    hit_cap: false,
                };
            }
        }
    }

    /// Resolve the recipe's single unknown, if it has exactly one.
    fn solve(&mut self, recipe: &Recipe) -> bool {
        let output = recipe.output();
        if !self.catalog.contains(output) {
            return false;
        }

        let output_unknown = self.is_unknown(output);
        let mut unknowns = usize::from(output_unknown);
        let mut unknown_input: Option<&Ingredient> = None;
        for ingredient in recipe.inputs() {
            if self.is_unknown(ingredient.item) {
                unknowns += 1;
                if unknowns >= 2 {
                    return false;
                }
                unknown_input = Some(ingredient);
            }
        }
        if unknowns == 0 {
            return false;
        }

        // Ingredients outside the catalog have no entry and drop out here.
        let mut known_inputs = Rational::zero();
        for ingredient in recipe.inputs() {
            if let Some(value) = self.known(ingredient.item) {
                known_inputs += &value.mul_quantity(ingredient.quantity.get());
            }
        }

        let (target, value) = if output_unknown {
            (output, known_inputs.div_quantity(recipe.output_quantity()))
        } else if let (Some(ingredient), Some(output_value)) = (unknown_input, self.known(output)) {
            let output_total = output_value.mul_quantity(recipe.output_quantity().get());
            (
                ingredient.item,
                (output_total - known_inputs).div_quantity(ingredient.quantity),
            )
        } else {
            return false;
        };

        let value = if value.is_positive() {
            value
        } else {
            self.settings.minimum()
        };
        trace!("Solved item {} = {} from recipe for {}", target, value, output);
        self.set(target, value);
        true
    }

    fn apply_fallback(&mut self) -> usize {
        let unresolved: Vec<ItemId> = self
            .values
            .iter()
            .filter(|(_, emc)| **emc == Emc::Unknown)
            .map(|(id, _)| *id)
            .collect();

        for id in &unresolved {
            let value = self.default_value(*id);
            debug!(
                "No recipe resolved {} ({}), defaulting to {}",
                self.catalog.get(*id).map_or("Unknown", |item| item.name.as_str()),
                id,
                value
            );
            self.set(*id, value);
        }
        if !unresolved.is_empty() {
            info!("{} items fell back to default values", unresolved.len());
        }
        unresolved.len()
    }

    fn finish(self) -> ValueTable {
        self.values
            .into_iter()
            .filter_map(|(id, emc)| match emc {
                Emc::Known(value) => Some((id, value)),
                Emc::Unknown => None,
            })
            .collect()
    }
}

/// Counters describing one calculation run
#[derive(Debug, Clone, Default)]
pub struct CalculationSummary {
    pub items: usize,
    pub recipes: usize,
    pub basic_items: usize,
    pub seeded: usize,
    pub solved: usize,
    pub fallback: usize,
    pub finalized: usize,
    pub sweeps: usize,
    pub hit_sweep_cap: bool,
    pub elapsed: Duration,
}

impl fmt::Display for CalculationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EMC Calculation Summary ===")?;
        writeln!(f, "Catalog: {} items, {} recipes", self.items, self.recipes)?;
        writeln!(f)?;

        writeln!(f, "Values:")?;
        writeln!(f, "  Basic items:          {}", self.basic_items)?;
        writeln!(f, "  Seed overrides:       {}", self.seeded)?;
        writeln!(f, "  Solved from recipes:  {}", self.solved)?;
        writeln!(f, "  Fallback defaults:    {}", self.fallback)?;
        writeln!(f, "  Equivalent overrides: {}", self.finalized)?;
        writeln!(f)?;

        write!(f, "Sweeps: {}", self.sweeps)?;
        if self.hit_sweep_cap {
            write!(f, " (cap reached)")?;
        }
        writeln!(f)?;
        writeln!(f, "Time: {:?}", self.elapsed)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use crate::overrides::OverrideTables;

    fn item(id: i32, market_value: u64) -> Item {
        Item::new(ItemId(id), format!("Item {id}"), market_value)
    }

    fn recipe(output: i32, quantity: u32, inputs: &[(i32, u32)]) -> Recipe {
        Recipe::new(
            ItemId(output),
            quantity,
            inputs.iter().map(|(id, q)| (ItemId(*id), *q)),
        )
        .unwrap()
    }

    fn catalog(items: Vec<Item>, recipes: Vec<Recipe>) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.extend(items);
        catalog.extend(recipes);
        catalog
    }

    fn config(seed: Vec<Override>, equivalent: Vec<Override>) -> CalculatorConfig {
        CalculatorConfig {
            engine: EngineSettings::default(),
            overrides: OverrideTables { seed, equivalent },
        }
    }

    fn value(calc: &Calculation, id: i32) -> Rational {
        calc.table.get(ItemId(id)).cloned().unwrap()
    }

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n, d).unwrap()
    }

    #[test]
    fn test_basic_item_seeding() {
        let catalog = catalog(vec![item(1, 50), item(2, 0), item(3, 3), item(4, 52)], vec![]);
        let calc = calculate_values(&catalog, &CalculatorConfig::default());

        assert_eq!(value(&calc, 1), r(10, 1));
        assert_eq!(value(&calc, 2), Rational::one());
        assert_eq!(value(&calc, 3), Rational::one());
        assert_eq!(value(&calc, 4), r(52, 5));
        assert_eq!(calc.summary.basic_items, 4);
    }

    #[test]
    fn test_single_unknown_output() {
        // A = 2, B = 5; 3A + B -> C
        let catalog = catalog(
            vec![item(1, 10), item(2, 25), item(3, 0)],
            vec![recipe(3, 1, &[(1, 3), (2, 1)])],
        );
        let calc = calculate_values(&catalog, &CalculatorConfig::default());

        assert_eq!(value(&calc, 3), r(11, 1));
        assert_eq!(calc.summary.solved, 1);
        assert_eq!(calc.summary.fallback, 0);
    }

    #[test]
    fn test_output_quantity_divides() {
        // Wood (1) + Gel (1) -> 3 Torches
        let catalog = catalog(
            vec![item(9, 5), item(23, 10), item(8, 0)],
            vec![recipe(8, 3, &[(9, 1), (23, 1)])],
        );
        let calc = calculate_values(&catalog, &CalculatorConfig::default());
        assert_eq!(value(&calc, 8), r(1, 1));

        let catalog = catalog_with_gel(10);
        let calc = calculate_values(&catalog, &CalculatorConfig::default());
        assert_eq!(value(&calc, 8), r(11, 3));
    }

    fn catalog_with_gel(gel_value: u64) -> Catalog {
        catalog(
            vec![item(9, 5), item(23, gel_value * 5), item(8, 0)],
            vec![recipe(8, 3, &[(9, 1), (23, 1)])],
        )
    }

    #[test]
    fn test_single_unknown_input() {
        // C is pinned to 11 and B = 5, so 3A + B -> C gives A = 2.
        // A and Z only produce each other, so A is not a basic item.
        let catalog = catalog(
            vec![item(1, 0), item(2, 25), item(3, 0), item(4, 0)],
            vec![
                recipe(3, 1, &[(1, 3), (2, 1)]),
                recipe(1, 1, &[(4, 2)]),
                recipe(4, 1, &[(1, 1)]),
            ],
        );
        let config = config(vec![Override::fixed(ItemId(3), r(11, 1))], vec![]);
        let calc = calculate_values(&catalog, &config);

        assert_eq!(value(&calc, 1), r(2, 1));
        assert_eq!(value(&calc, 4), r(1, 1));
        assert_eq!(calc.summary.seeded, 1);
        assert_eq!(calc.summary.fallback, 0);
    }

    #[test]
    fn test_minimum_floor() {
        // C pinned to 1 but B alone is worth 5: A would be -4.
        let catalog = catalog(
            vec![item(1, 0), item(2, 25), item(3, 0), item(4, 0)],
            vec![
                recipe(3, 1, &[(1, 1), (2, 1)]),
                recipe(1, 1, &[(4, 1)]),
                recipe(4, 1, &[(1, 1)]),
            ],
        );
        let config = config(vec![Override::fixed(ItemId(3), Rational::one())], vec![]);
        let calc = calculate_values(&catalog, &config);
        assert_eq!(value(&calc, 1), Rational::one());

        // An output built only from a zero-valued input still gets 1.
        let catalog = self::catalog(
            vec![item(1, 0), item(2, 0)],
            vec![recipe(2, 1, &[(1, 4)])],
        );
        let config = self::config(vec![Override::fixed(ItemId(1), Rational::zero())], vec![]);
        let calc = calculate_values(&catalog, &config);
        assert_eq!(value(&calc, 1), Rational::zero());
        assert_eq!(value(&calc, 2), Rational::one());
    }

    #[test]
    fn test_configured_minimum_value() {
        // Dirt is worthless, Torch (3 per craft) sits below the minimum.
        let catalog = catalog(
            vec![item(2, 0), item(9, 5), item(8, 0), item(10, 0)],
            vec![recipe(8, 3, &[(9, 1)]), recipe(10, 1, &[(2, 1)])],
        );
        let mut config = config(vec![Override::fixed(ItemId(2), Rational::zero())], vec![]);
        config.engine.minimum_value = 3;
        let calc = calculate_values(&catalog, &config);

        // Basic items: Dirt is pinned to zero, Wood floors at the minimum.
        assert_eq!(value(&calc, 2), Rational::zero());
        assert_eq!(value(&calc, 9), r(3, 1));
        // Positive solved values are kept even below the minimum.
        assert_eq!(value(&calc, 8), r(1, 1));
        // Non-positive solved values become the minimum.
        assert_eq!(value(&calc, 10), r(3, 1));

        let catalog = self::catalog(vec![item(2, 0)], vec![]);
        let config = CalculatorConfig::from_toml_str("[engine]\nminimum_value = 3\n").unwrap();
        let calc = calculate_values(&catalog, &config);
        assert_eq!(value(&calc, 2), r(3, 1));
    }

    #[test]
    fn test_isolated_cycle_falls_back() {
        let catalog = catalog(
            vec![item(1, 100), item(2, 3)],
            vec![recipe(1, 1, &[(2, 1)]), recipe(2, 1, &[(1, 1)])],
        );
        let calc = calculate_values(&catalog, &CalculatorConfig::default());

        assert_eq!(value(&calc, 1), r(20, 1));
        assert_eq!(value(&calc, 2), Rational::one());
        assert_eq!(calc.summary.fallback, 2);
        assert!(!calc.summary.hit_sweep_cap);
    }

    #[test]
    fn test_ingredients_outside_catalog_are_ignored() {
        let catalog = catalog(
            vec![item(1, 20), item(3, 0)],
            vec![recipe(3, 1, &[(1, 2), (77, 5)]), recipe(88, 1, &[(1, 1)])],
        );
        let calc = calculate_values(&catalog, &CalculatorConfig::default());

        assert_eq!(value(&calc, 3), r(8, 1));
        assert_eq!(calc.table.get(ItemId(77)), None);
        assert_eq!(calc.table.get(ItemId(88)), None);
        assert_eq!(calc.table.len(), 2);
    }

    #[test]
    fn test_chain_resolves_across_sweeps() {
        // Recipes listed deepest-first so each sweep resolves one link.
        let catalog = catalog(
            vec![item(1, 10), item(2, 0), item(3, 0), item(4, 0)],
            vec![
                recipe(4, 1, &[(3, 2)]),
                recipe(3, 1, &[(2, 2)]),
                recipe(2, 1, &[(1, 2)]),
            ],
        );
        let calc = calculate_values(&catalog, &CalculatorConfig::default());

        assert_eq!(value(&calc, 2), r(4, 1));
        assert_eq!(value(&calc, 3), r(8, 1));
        assert_eq!(value(&calc, 4), r(16, 1));
        assert_eq!(calc.summary.sweeps, 4);
        assert_eq!(calc.summary.solved, 3);
    }

    #[test]
    fn test_sweep_cap_falls_back() {
        let catalog = catalog(
            vec![item(1, 10), item(2, 0), item(3, 50), item(4, 0)],
            vec![
                recipe(4, 1, &[(3, 2)]),
                recipe(3, 1, &[(2, 2)]),
                recipe(2, 1, &[(1, 2)]),
            ],
        );
        let mut config = CalculatorConfig::default();
        config.engine.max_sweeps = Some(1);
        let calc = calculate_values(&catalog, &config);

        assert!(calc.summary.hit_sweep_cap);
        assert_eq!(value(&calc, 2), r(4, 1));
        assert_eq!(value(&calc, 3), r(10, 1));
        assert_eq!(value(&calc, 4), Rational::one());
        assert_eq!(calc.summary.fallback, 2);
    }

    #[test]
    fn test_idempotent() {
        let catalog = catalog(
            vec![item(1, 7), item(2, 13), item(3, 0), item(4, 0), item(5, 9)],
            vec![
                recipe(3, 2, &[(1, 3), (2, 1)]),
                recipe(4, 5, &[(3, 1), (5, 2)]),
                recipe(5, 1, &[(4, 1)]),
            ],
        );
        let config = CalculatorConfig::default();
        let first = calculate_values(&catalog, &config);
        let second = calculate_values(&catalog, &config);
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn test_equivalent_overrides_win() {
        // 2 is computed as 4, 3 is a variant that must match it, 1 is forced.
        let catalog = catalog(
            vec![item(1, 10), item(2, 0), item(3, 500)],
            vec![recipe(2, 1, &[(1, 2)]), recipe(3, 1, &[(1, 1)])],
        );
        let config = config(
            vec![],
            vec![
                Override::same_as(ItemId(3), ItemId(2)),
                Override::fixed(ItemId(1), r(7, 2)),
            ],
        );
        let calc = calculate_values(&catalog, &config);

        assert_eq!(value(&calc, 2), r(4, 1));
        assert_eq!(value(&calc, 3), r(4, 1));
        assert_eq!(value(&calc, 1), r(7, 2));
        assert_eq!(calc.summary.finalized, 2);
    }

    #[test]
    fn test_seed_override_replaces_basic_default() {
        // Boss bags are pinned to zero so they can never be learned.
        let catalog = catalog(
            vec![item(3318, 0), item(2, 0)],
            vec![],
        );
        let config = config(vec![Override::fixed(ItemId(3318), Rational::zero())], vec![]);
        let calc = calculate_values(&catalog, &config);

        assert_eq!(value(&calc, 3318), Rational::zero());
        assert_eq!(value(&calc, 2), Rational::one());
    }

    #[test]
    fn test_namespaced_overrides_need_their_mod() {
        let catalog = catalog(vec![item(1, 50)], vec![]);
        let config = config(
            vec![Override::fixed(ItemId(1), r(99, 1)).in_namespace("ThoriumMod")],
            vec![],
        );
        let calc = calculate_values(&catalog, &config);
        assert_eq!(value(&calc, 1), r(10, 1));
        assert_eq!(calc.summary.seeded, 0);
    }
}
