//! Flat variable store with mutable and immutable bindings.

use std::collections::BTreeMap;

use crate::error::ImmutableAccessError;

/// A single variable scope.
///
/// Unknown keys read as `None` instead of failing. Keys defined through
/// [`Variables::define_immutable`] (the `glossary` section of a task or plan)
/// can never be written again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    mutable: BTreeMap<String, String>,
    immutable: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.mutable
            .get(key)
            .or_else(|| self.immutable.get(key))
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.mutable.contains_key(key) || self.immutable.contains_key(key)
    }

    /// Write a mutable binding.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ImmutableAccessError> {
        let key = key.into();
        if self.immutable.contains_key(&key) {
            return Err(ImmutableAccessError { key });
        }
        self.mutable.insert(key, value.into());
        Ok(())
    }

    /// Freeze `key` with `value`, dropping any mutable binding of the same name.
    pub fn define_immutable(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ImmutableAccessError> {
        let key = key.into();
        if self.immutable.contains_key(&key) {
            return Err(ImmutableAccessError { key });
        }
        self.mutable.remove(&key);
        self.immutable.insert(key, value.into());
        Ok(())
    }

    pub fn is_immutable(&self, key: &str) -> bool {
        self.immutable.contains_key(key)
    }

    /// Mutable keys first, then immutable keys, each in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mutable
            .keys()
            .chain(self.immutable.keys())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mutable
            .iter()
            .chain(self.immutable.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.mutable.len() + self.immutable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
