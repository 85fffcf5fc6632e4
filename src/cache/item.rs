//! Lookup result value object.

use serde::de::DeserializeOwned;

use crate::cache::CacheError;

/// Result of a cache lookup.
///
/// `found` is true only when the key existed and was readable at lookup
/// time. A miss never carries a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem<T = Vec<u8>> {
    key: String,
    value: Option<T>,
    found: bool,
}

impl<T> CacheItem<T> {
    /// A successful lookup.
    pub fn hit(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            found: true,
        }
    }

    /// A lookup for a key the backend does not hold (or a disabled cache).
    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            found: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Consume the item, returning the value on a hit.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Transform the value of a hit, keeping key and found flag.
    pub fn try_map<U, E, F>(self, f: F) -> Result<CacheItem<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        let value = self.value.map(f).transpose()?;
        Ok(CacheItem {
            key: self.key,
            value,
            found: self.found,
        })
    }
}

impl CacheItem<Vec<u8>> {
    /// Deserialize the stored JSON bytes into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<CacheItem<T>, CacheError> {
        self.try_map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_carries_value() {
        let item = CacheItem::hit("a", b"\"hello\"".to_vec());
        assert!(item.is_found());
        assert_eq!(item.key(), "a");
        assert_eq!(item.value(), Some(&b"\"hello\"".to_vec()));
    }

    #[test]
    fn test_miss_has_no_value() {
        let item: CacheItem = CacheItem::miss("missing");
        assert!(!item.is_found());
        assert_eq!(item.key(), "missing");
        assert!(item.into_value().is_none());
    }

    #[test]
    fn test_decode_hit() {
        let item = CacheItem::hit("a", b"\"hello\"".to_vec());
        let decoded: CacheItem<String> = item.decode().unwrap();
        assert!(decoded.is_found());
        assert_eq!(decoded.into_value(), Some("hello".to_string()));
    }

    #[test]
    fn test_decode_miss_stays_miss() {
        let decoded: CacheItem<String> = CacheItem::<Vec<u8>>::miss("a").decode().unwrap();
        assert!(!decoded.is_found());
        assert_eq!(decoded.key(), "a");
    }

    #[test]
    fn test_decode_garbage_is_serialization_error() {
        let item = CacheItem::hit("a", b"not json".to_vec());
        let err = item.decode::<u32>().unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
