use super::message::field;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A view-model field tagged with the version of the update that last set it
///
/// An offer older than the stored version is refused, which keeps a slow bulk
/// snapshot from overwriting a field a push message already refreshed.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    value: Option<T>,
    version: u64,
}

impl<T> Default for Versioned<T> {
    fn default() -> Self {
        Self {
            value: None,
            version: 0,
        }
    }
}

impl<T> Versioned<T> {
    /// Store `value` unless a newer one is already present
    pub fn offer(&mut self, value: T, version: u64) -> bool {
        if self.value.is_some() && version < self.version {
            return false;
        }
        self.value = Some(value);
        self.version = version;
        true
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Decode `name` from an update and offer it
    pub(crate) fn offer_field(
        &mut self,
        fields: &Map<String, Value>,
        name: &str,
        version: u64,
    ) -> bool
    where
        T: DeserializeOwned,
    {
        match field::<T>(fields, name) {
            Some(value) => self.offer(value, version),
            None => false,
        }
    }
}

impl<T: Serialize> Serialize for Versioned<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
