//! Identifiers discovered while talking to the target, and the per-user cache holding them.

use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An entity identifier as returned by the target API.
///
/// Only JSON integers and strings are accepted. Equality is exact, so `1` and `"1"` are distinct.
///
/// Integers must fit into an `i64`. Larger or fractional numbers are not identifiers, and objects
/// carrying them are skipped like objects without the field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// A numeric identifier.
    Number(i64),
    /// A textual identifier.
    Text(String),
}

impl Id {
    /// Reads the identifier stored under `field` in a JSON object.
    ///
    /// Returns `None` if `value` is not an object, the field is absent, or it holds something other
    /// than an integer or a string.
    pub fn from_field(value: &Value, field: &str) -> Option<Self> {
        match value.get(field)? {
            Value::Number(number) => number.as_i64().map(Id::Number),
            Value::String(text) => Some(Id::Text(text.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(number) => write!(f, "{number}"),
            Id::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Id {
    fn from(number: i64) -> Self {
        Id::Number(number)
    }
}

impl From<&str> for Id {
    fn from(text: &str) -> Self {
        Id::Text(text.to_owned())
    }
}

/// The identifiers a single simulated user currently believes to exist.
///
/// Each user owns its cache; it is never shared. An identifier that was removed stays gone
/// until a list fetch or create reports it again.
#[derive(Clone, Debug, Default)]
pub struct IdCache {
    ids: Vec<Id>,
}

impl IdCache {
    /// Returns `true` if no identifier is known.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of known identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if `id` is known.
    pub fn contains(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    /// The known identifiers in discovery order.
    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }

    /// Replaces all known identifiers.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = Id>) {
        self.ids.clear();
        self.ids.extend(ids);
    }

    /// Adds `id` unless it is already known. Returns `true` if it was added.
    pub fn insert(&mut self, id: Id) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Forgets `id`. Returns `true` if it was known.
    pub fn remove(&mut self, id: &Id) -> bool {
        let before = self.ids.len();
        self.ids.retain(|known| known != id);
        self.ids.len() != before
    }

    /// Picks a uniformly random known identifier.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Id> {
        self.ids.choose(rng).cloned()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_scalar_fields_only() {
        let product = json!({"productId": 3, "name": "Dog Collar", "tags": ["a"]});
        assert_eq!(Id::from_field(&product, "productId"), Some(Id::Number(3)));
        assert_eq!(Id::from_field(&product, "id"), None);
        assert_eq!(Id::from_field(&product, "tags"), None);

        let textual = json!({"id": "abc"});
        assert_eq!(Id::from_field(&textual, "id"), Some(Id::from("abc")));

        assert_eq!(Id::from_field(&json!([1, 2]), "id"), None);
        assert_eq!(Id::from_field(&json!({"id": 1.5}), "id"), None);
        assert_eq!(Id::from_field(&json!({"id": u64::MAX}), "id"), None);
        assert_eq!(
            Id::from_field(&json!({"id": i64::MAX}), "id"),
            Some(Id::from(i64::MAX))
        );
    }

    #[test]
    fn insert_dedups_exact_matches() {
        let mut cache = IdCache::default();
        assert!(cache.insert(Id::Number(1)));
        assert!(!cache.insert(Id::Number(1)));
        assert!(cache.insert(Id::from("1")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn removed_ids_are_never_chosen() {
        let mut cache = IdCache::default();
        cache.replace([Id::Number(1), Id::Number(2), Id::Number(3)]);
        assert!(cache.remove(&Id::Number(2)));
        assert!(!cache.remove(&Id::Number(2)));

        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..100 {
            let id = cache.choose(&mut rng).unwrap();
            assert_ne!(id, Id::Number(2));
        }
    }

    #[test]
    fn choose_on_empty() {
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(IdCache::default().choose(&mut rng), None);
    }

    #[test]
    fn display_is_path_friendly() {
        assert_eq!(Id::Number(42).to_string(), "42");
        assert_eq!(Id::from("sku-1").to_string(), "sku-1");
    }
}
