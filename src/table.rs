//! Finished value tables and the store that publishes them

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::ItemId;
use crate::rational::Rational;

/// Item -> EMC mapping produced by one calculation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueTable {
    values: BTreeMap<ItemId, Rational>,
}

impl ValueTable {
    pub fn get(&self, id: ItemId) -> Option<&Rational> {
        self.values.get(&id)
    }

    /// Lookup that treats unknown identifiers as worth nothing.
    pub fn value_or_zero(&self, id: ItemId) -> Rational {
        self.values.get(&id).cloned().unwrap_or_else(Rational::zero)
    }

    /// Value of `count` copies of an item.
    pub fn stack_value(&self, id: ItemId, count: u32) -> Rational {
        self.value_or_zero(id).mul_quantity(count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &Rational)> {
        self.values.iter().map(|(id, value)| (*id, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(ItemId, Rational)> for ValueTable {
    fn from_iter<T: IntoIterator<Item = (ItemId, Rational)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Holds the current table. Publishing swaps in a new snapshot; readers
/// keep whatever `Arc` they already hold.
#[derive(Debug, Default)]
pub struct ValueStore {
    current: RwLock<Option<Arc<ValueTable>>>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published table, returning the new snapshot.
    pub fn publish(&self, table: ValueTable) -> Arc<ValueTable> {
        let table = Arc::new(table);
        *self.current.write() = Some(Arc::clone(&table));
        table
    }

    /// `None` until the first calculation has been published.
    pub fn snapshot(&self) -> Option<Arc<ValueTable>> {
        self.current.read().as_ref().map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.current.read().is_some()
    }

    /// Point lookup against the current snapshot; zero when unpublished or unknown.
    pub fn value_of(&self, id: ItemId) -> Rational {
        self.current
            .read()
            .as_ref()
            .map_or_else(Rational::zero, |table| table.value_or_zero(id))
    }
}
