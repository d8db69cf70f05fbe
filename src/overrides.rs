//! Curated override tables
//!
//! Seed entries pin values before relaxation; equivalent entries force
//! final values afterwards. Both are plain data loaded from the config
//! file, e.g.
//!
//! ```toml
//! [[seed]]
//! item = 173          # Obsidian
//! value = 1000
//!
//! [[seed]]
//! item = 1729         # Spooky Wood
//! market_of = 1809    # Spooky Breastplate
//! divide_by = 300
//!
//! [[equivalent]]
//! item = 5000
//! same_as = 22
//! namespace = "SomeMod"
//! ```

use std::num::NonZeroU32;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::error::ConfigError;
use crate::models::ItemId;
use crate::rational::Rational;

// ============================================================================
// Raw TOML Structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOverride {
    pub item: ItemId,
    /// Human-readable label; not used by the engine.
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub value: Option<RawValue>,
    pub market_of: Option<ItemId>,
    pub divide_by: Option<NonZeroU32>,
    pub same_as: Option<ItemId>,
}

// ============================================================================
// Resolved Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideValue {
    Fixed(Rational),
    /// `market_value(item) / sale_divisor / divide_by`
    MarketOf { item: ItemId, divide_by: NonZeroU32 },
    /// Copy the final value of a canonical item. Post-pass only.
    SameAs(ItemId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    pub item: ItemId,
    pub namespace: Option<String>,
    pub value: OverrideValue,
}

impl Override {
    pub fn fixed(item: ItemId, value: Rational) -> Self {
        Self {
            item,
            namespace: None,
            value: OverrideValue::Fixed(value),
        }
    }

    pub fn same_as(item: ItemId, canonical: ItemId) -> Self {
        Self {
            item,
            namespace: None,
            value: OverrideValue::SameAs(canonical),
        }
    }

    pub fn market_of(item: ItemId, source: ItemId, divide_by: NonZeroU32) -> Self {
        Self {
            item,
            namespace: None,
            value: OverrideValue::MarketOf {
                item: source,
                divide_by,
            },
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn from_raw(raw: &RawOverride, allow_same_as: bool) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidOverride {
            item: raw.item,
            reason: reason.to_string(),
        };

        let value = match (&raw.value, raw.market_of, raw.same_as) {
            (Some(value), None, None) => {
                let value = match value {
                    RawValue::Integer(n) => Rational::from(*n),
                    RawValue::Text(text) => text
                        .parse::<Rational>()
                        .map_err(|e| invalid(&e.to_string()))?,
                };
                if value < Rational::zero() {
                    return Err(invalid("value must not be negative"));
                }
                OverrideValue::Fixed(value)
            }
            (None, Some(source), None) => OverrideValue::MarketOf {
                item: source,
                divide_by: raw.divide_by.unwrap_or(NonZeroU32::MIN),
            },
            (None, None, Some(canonical)) if allow_same_as => OverrideValue::SameAs(canonical),
            (None, None, Some(_)) => {
                return Err(invalid("same_as is only allowed in [[equivalent]] entries"));
            }
            _ => {
                return Err(invalid(
                    "exactly one of value, market_of or same_as must be set",
                ));
            }
        };

        if raw.divide_by.is_some() && !matches!(value, OverrideValue::MarketOf { .. }) {
            return Err(invalid("divide_by only applies to market_of"));
        }

        Ok(Self {
            item: raw.item,
            namespace: raw.namespace.clone(),
            value,
        })
    }

    /// The entry targets an item in the catalog, and its namespace (if any) is loaded.
    pub fn applies_to(&self, catalog: &Catalog) -> bool {
        catalog.contains(self.item)
            && self
                .namespace
                .as_deref()
                .map_or(true, |ns| catalog.has_namespace(ns))
    }

    /// Compute the forced value. `current` looks up already-settled values
    /// for `SameAs`. `None` means the source is unavailable and the entry
    /// should be skipped.
    pub fn resolve(
        &self,
        catalog: &Catalog,
        sale_divisor: NonZeroU32,
        current: impl Fn(ItemId) -> Option<Rational>,
    ) -> Option<Rational> {
        match &self.value {
            OverrideValue::Fixed(value) => Some(value.clone()),
            OverrideValue::MarketOf { item, divide_by } => {
                let market = catalog.get(*item)?.market_value;
                Some(
                    Rational::from_integer(market)
                        .div_quantity(sale_divisor)
                        .div_quantity(*divide_by),
                )
            }
            OverrideValue::SameAs(canonical) => current(*canonical),
        }
    }
}

/// Pre-pass and post-pass override entries, applied in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTables {
    pub seed: Vec<Override>,
    pub equivalent: Vec<Override>,
}

impl OverrideTables {
    pub fn from_raw(seed: &[RawOverride], equivalent: &[RawOverride]) -> Result<Self, ConfigError> {
        Ok(Self {
            seed: seed
                .iter()
                .map(|raw| Override::from_raw(raw, false))
                .collect::<Result<_, _>>()?,
            equivalent: equivalent
                .iter()
                .map(|raw| Override::from_raw(raw, true))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.seed.is_empty() && self.equivalent.is_empty()
    }
}
