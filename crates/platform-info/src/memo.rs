//! Memo cache for platform info results.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::{PlatformInfoError, Result};

/// Whether a value counts as present for memoization.
///
/// Numbers are falsy at zero (and NaN), strings when empty, `bool` when
/// `false`, `Option` when `None` or holding a falsy value, `()` always.
/// Types without a natural empty state opt in with an empty impl and are
/// always truthy.
pub trait Truthy {
    fn is_truthy(&self) -> bool {
        true
    }
}

macro_rules! truthy_int {
    ($($t:ty),*) => {
        $(impl Truthy for $t {
            fn is_truthy(&self) -> bool {
                *self != 0
            }
        })*
    };
}

truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0 && !self.is_nan()
    }
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for &'static str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for () {
    fn is_truthy(&self) -> bool {
        false
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

impl Truthy for char {}

impl<T> Truthy for Vec<T> {}

impl<K, V, S> Truthy for HashMap<K, V, S> {}

impl<T: Truthy> Truthy for Arc<T> {
    fn is_truthy(&self) -> bool {
        T::is_truthy(self)
    }
}

/// Bounds every looked-up value must satisfy.
pub trait InfoValue: Truthy + Clone + Send + Sync + 'static {}

impl<T: Truthy + Clone + Send + Sync + 'static> InfoValue for T {}

/// Which results are written to, and served from, the memo cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoPolicy {
    /// Falsy results are neither stored nor served; the getter reruns.
    #[default]
    SkipFalsy,
    /// Any successful result is stored and served.
    Always,
}

impl MemoPolicy {
    pub fn accepts<T: Truthy>(&self, value: &T) -> bool {
        match self {
            MemoPolicy::SkipFalsy => value.is_truthy(),
            MemoPolicy::Always => true,
        }
    }
}

type Entries = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Unbounded key/value cache shared by clones.
#[derive(Debug, Clone, Default)]
pub struct MemoCache {
    entries: Arc<RwLock<Entries>>,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by dispatchers built without an explicit one.
    pub fn global() -> &'static MemoCache {
        static GLOBAL: OnceLock<MemoCache> = OnceLock::new();
        GLOBAL.get_or_init(MemoCache::new)
    }

    /// Cached value for `key`, if one is present and accepted by `policy`.
    pub fn lookup<T: InfoValue>(&self, key: &str, policy: MemoPolicy) -> Result<Option<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };

        let value = entry.downcast_ref::<T>().ok_or_else(|| {
            warn!("Memo entry {:?} requested as {}", key, std::any::type_name::<T>());
            PlatformInfoError::MemoTypeMismatch {
                key: key.to_string(),
            }
        })?;

        if policy.accepts(value) {
            Ok(Some(value.clone()))
        } else {
            debug!("Memo entry {:?} is falsy, treating as a miss", key);
            Ok(None)
        }
    }

    /// Store `value` under `key` when `policy` accepts it, overwriting any
    /// existing entry. A rejected value evicts the key instead, so the last
    /// write always decides what the next lookup sees. Returns whether the
    /// value was stored.
    pub fn store<T: InfoValue>(&self, key: &str, value: &T, policy: MemoPolicy) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !policy.accepts(value) {
            entries.remove(key);
            return false;
        }

        entries.insert(key.to_string(), Arc::new(value.clone()));
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        info!("Clearing {} memo entries", entries.len());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falsy_values() {
        assert!(!0i32.is_truthy());
        assert!(!0.0f64.is_truthy());
        assert!(!f64::NAN.is_truthy());
        assert!(!false.is_truthy());
        assert!(!String::new().is_truthy());
        assert!(!"".is_truthy());
        assert!(!().is_truthy());
        assert!(!None::<u8>.is_truthy());
        assert!(!Some(0u8).is_truthy());
    }

    #[test]
    fn test_truthy_values() {
        assert!(42u64.is_truthy());
        assert!((-1i8).is_truthy());
        assert!("hello".is_truthy());
        assert!(Some(true).is_truthy());
        assert!(Vec::<u8>::new().is_truthy());
        assert!(Arc::new("x".to_string()).is_truthy());
    }

    #[test]
    fn test_store_respects_policy() {
        let cache = MemoCache::new();
        assert!(!cache.store("zero", &0u32, MemoPolicy::SkipFalsy));
        assert!(!cache.contains("zero"));
        assert!(cache.store("zero", &0u32, MemoPolicy::Always));
        assert!(cache.contains("zero"));

        assert_eq!(cache.lookup::<u32>("zero", MemoPolicy::Always).unwrap(), Some(0));
        assert_eq!(cache.lookup::<u32>("zero", MemoPolicy::SkipFalsy).unwrap(), None);
    }

    #[test]
    fn test_falsy_store_evicts_previous_value() {
        let cache = MemoCache::new();
        assert!(cache.store("level", &80u8, MemoPolicy::SkipFalsy));
        assert!(!cache.store("level", &0u8, MemoPolicy::SkipFalsy));
        assert!(!cache.contains("level"));
        assert_eq!(cache.lookup::<u8>("level", MemoPolicy::SkipFalsy).unwrap(), None);
    }

    #[test]
    fn test_lookup_type_mismatch() {
        let cache = MemoCache::new();
        cache.store("answer", &42i32, MemoPolicy::SkipFalsy);
        let err = cache.lookup::<String>("answer", MemoPolicy::SkipFalsy).unwrap_err();
        assert!(matches!(err, PlatformInfoError::MemoTypeMismatch { key } if key == "answer"));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = MemoCache::new();
        let other = cache.clone();
        cache.store("k", &"v", MemoPolicy::SkipFalsy);
        assert_eq!(other.len(), 1);
        assert!(other.remove("k"));
        assert!(!other.remove("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = MemoCache::new();
        cache.store("a", &1u8, MemoPolicy::SkipFalsy);
        cache.store("b", &2u8, MemoPolicy::SkipFalsy);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_policy_deserializes_from_config() {
        let policy: MemoPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(policy, MemoPolicy::Always);
        assert_eq!(MemoPolicy::default(), MemoPolicy::SkipFalsy);
    }
}
