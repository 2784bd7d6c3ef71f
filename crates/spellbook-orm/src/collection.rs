//! Result collections.

use std::ops::{Deref, DerefMut};

use crate::driver::Driver;
use crate::error::Result;
use crate::instance::Instance;

/// The instances a query resolved to.
#[derive(Debug, Clone, Default)]
pub struct Collection(Vec<Instance>);

impl Collection {
    /// Wraps instances.
    #[must_use]
    pub const fn new(instances: Vec<Instance>) -> Self {
        Self(instances)
    }

    /// Unwraps the instances.
    #[must_use]
    pub fn into_vec(self) -> Vec<Instance> {
        self.0
    }

    /// Saves every instance in order, stopping at the first failure.
    /// Returns the total of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Instance::save`].
    pub async fn save_all<D: Driver>(&mut self, driver: &D) -> Result<u64> {
        let mut affected = 0;
        for instance in &mut self.0 {
            affected += instance.save(driver).await?;
        }
        Ok(affected)
    }

    /// Serializes every instance with [`Instance::to_json`].
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.0.iter().map(Instance::to_json).collect()
    }

    /// Serializes every instance with [`Instance::to_object`].
    #[must_use]
    pub fn to_object(&self) -> serde_json::Value {
        self.0.iter().map(Instance::to_object).collect()
    }
}

impl Deref for Collection {
    type Target = [Instance];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Collection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Instance>> for Collection {
    fn from(instances: Vec<Instance>) -> Self {
        Self(instances)
    }
}

impl FromIterator<Instance> for Collection {
    fn from_iter<I: IntoIterator<Item = Instance>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = Instance;
    type IntoIter = std::vec::IntoIter<Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
