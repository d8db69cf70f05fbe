//! Error types for the EMC calculator

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ItemId;

/// Contract violations in exact rational arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RationalError {
    /// A rational was constructed with a zero denominator.
    #[error("denominator cannot be zero")]
    ZeroDenominator,

    /// Division by (or reciprocal of) zero.
    #[error("division by zero")]
    DivideByZero,

    /// Text that is not `N` or `N/D`.
    #[error("invalid rational literal '{0}'")]
    Parse(String),
}

/// Malformed item or recipe descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("recipe for item {output} produces zero items")]
    ZeroOutputQuantity { output: ItemId },

    #[error("recipe for item {output} needs zero of ingredient {input}")]
    ZeroQuantity { output: ItemId, input: ItemId },

    #[error("recipe for item {output} has no ingredients")]
    EmptyRecipe { output: ItemId },
}

/// Problems loading the calculator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid override for item {item}: {reason}")]
    InvalidOverride { item: ItemId, reason: String },
}
