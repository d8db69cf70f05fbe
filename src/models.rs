//! Data models for catalog items and crafting recipes

use std::fmt;
use std::num::NonZeroU32;

use serde::Deserialize;

use crate::error::CatalogError;

/// Host item type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub market_value: u64, // sale price in the host's smallest coin
    pub namespace: Option<String>, // owning mod, None for the base game
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, market_value: u64) -> Self {
        Self {
            id,
            name: name.into(),
            market_value,
            namespace: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingredient {
    pub item: ItemId,
    pub quantity: NonZeroU32,
}

/// A crafting recipe: `inputs -> output_quantity x output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    output: ItemId,
    output_quantity: NonZeroU32,
    inputs: Vec<Ingredient>,
}

impl Recipe {
    /// Validate quantities and merge repeated ingredients, keeping first-seen order.
    pub fn new(
        output: ItemId,
        output_quantity: u32,
        inputs: impl IntoIterator<Item = (ItemId, u32)>,
    ) -> Result<Self, CatalogError> {
        let output_quantity =
            NonZeroU32::new(output_quantity).ok_or(CatalogError::ZeroOutputQuantity { output })?;

        let mut merged: Vec<Ingredient> = Vec::new();
        for (item, quantity) in inputs {
            let quantity = NonZeroU32::new(quantity)
                .ok_or(CatalogError::ZeroQuantity { output, input: item })?;
            match merged.iter_mut().find(|i| i.item == item) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(quantity.get());
                }
                None => merged.push(Ingredient { item, quantity }),
            }
        }

        if merged.is_empty() {
            return Err(CatalogError::EmptyRecipe { output });
        }

        Ok(Self {
            output,
            output_quantity,
            inputs: merged,
        })
    }

    pub fn output(&self) -> ItemId {
        self.output
    }

    pub fn output_quantity(&self) -> NonZeroU32 {
        self.output_quantity
    }

    pub fn inputs(&self) -> &[Ingredient] {
        &self.inputs
    }
}
