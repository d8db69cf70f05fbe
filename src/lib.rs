//! EMC value calculator
//!
//! Assigns an exact rational "EMC" value to every item in a crafting
//! catalog by relaxing the linear equations its recipes define.

pub mod calculator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod overrides;
pub mod rational;
pub mod table;

pub use calculator::{calculate_values, Calculation, CalculationSummary};
pub use catalog::Catalog;
pub use config::CalculatorConfig;
pub use models::{Item, ItemId, Recipe};
pub use rational::Rational;
pub use table::{ValueStore, ValueTable};
