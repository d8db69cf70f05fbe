//! Immutable snapshot of the items and recipes a calculation runs over

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::models::{Item, ItemId, Recipe};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, Item>,
    recipes: Vec<Recipe>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item. Items with an empty or blank name are placeholders and
    /// are left out; returns whether the item was accepted.
    pub fn add_item(&mut self, item: Item) -> bool {
        if item.name.trim().is_empty() {
            debug!("Skipping unnamed item {}", item.id);
            return false;
        }
        self.items.insert(item.id, item);
        true
    }

    pub fn add_recipe(&mut self, recipe: Recipe) {
        self.recipes.push(recipe);
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Items in identifier order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Items that no recipe produces.
    pub fn basic_items(&self) -> Vec<ItemId> {
        let produced: HashSet<ItemId> = self.recipes.iter().map(|r| r.output()).collect();
        self.items
            .keys()
            .copied()
            .filter(|id| !produced.contains(id))
            .collect()
    }

    /// Whether any item belongs to the given mod namespace.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.items
            .values()
            .any(|item| item.namespace.as_deref() == Some(namespace))
    }
}

impl Extend<Item> for Catalog {
    fn extend<T: IntoIterator<Item = Item>>(&mut self, iter: T) {
        for item in iter {
            self.add_item(item);
        }
    }
}

impl Extend<Recipe> for Catalog {
    fn extend<T: IntoIterator<Item = Recipe>>(&mut self, iter: T) {
        self.recipes.extend(iter);
    }
}
