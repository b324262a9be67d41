//! Query Keys
//!
//! Every query a manager tracks is deduplicated by a string key. The
//! derivation rules are:
//!
//! 1. A string query is its own key.
//! 2. An absent query (`None`) has the empty key.
//! 3. A structured query carrying a string `key` field uses that field.
//! 4. Anything else is stringified (integers in decimal, structured values as
//!    compact JSON).
//!
//! Falsy structured values (`null`, `false`, `0`) have no usable key and fail
//! with [`KeyError::Falsy`].
//!
//! Managers may replace the derivation entirely with a [`KeyFn`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure to derive a key from a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("query {0} is falsy and has no key")]
    Falsy(String),

    #[error("query cannot be stringified: {0}")]
    Unserializable(String),
}

/// Pluggable key derivation, stored per manager.
pub type KeyFn<Q> = Arc<dyn Fn(&Q) -> Result<String, KeyError> + Send + Sync>;

/// Types that can be used as queries without a custom key function.
pub trait QueryKey {
    /// Derive the deduplication key for this query.
    fn query_key(&self) -> Result<String, KeyError>;
}

impl QueryKey for str {
    fn query_key(&self) -> Result<String, KeyError> {
        Ok(self.to_owned())
    }
}

impl QueryKey for String {
    fn query_key(&self) -> Result<String, KeyError> {
        Ok(self.clone())
    }
}

impl<Q: QueryKey + ?Sized> QueryKey for &Q {
    fn query_key(&self) -> Result<String, KeyError> {
        (**self).query_key()
    }
}

impl<Q: QueryKey> QueryKey for Option<Q> {
    fn query_key(&self) -> Result<String, KeyError> {
        match self {
            Some(query) => query.query_key(),
            None => Ok(String::new()),
        }
    }
}

impl<Q: QueryKey + ?Sized> QueryKey for Arc<Q> {
    fn query_key(&self) -> Result<String, KeyError> {
        (**self).query_key()
    }
}

impl QueryKey for Value {
    fn query_key(&self) -> Result<String, KeyError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Null | Value::Bool(false) => Err(KeyError::Falsy(self.to_string())),
            Value::Number(n) if n.as_f64() == Some(0.0) => Err(KeyError::Falsy(self.to_string())),
            Value::Object(map) => match map.get("key") {
                Some(Value::String(key)) => Ok(key.clone()),
                _ => Ok(self.to_string()),
            },
            _ => Ok(self.to_string()),
        }
    }
}

macro_rules! impl_integer_key {
    ($($ty:ty),*) => {
        $(
            impl QueryKey for $ty {
                fn query_key(&self) -> Result<String, KeyError> {
                    Ok(self.to_string())
                }
            }
        )*
    };
}

impl_integer_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// Derive a key for any serializable query using the JSON rules above.
pub fn json_key<S: Serialize + ?Sized>(query: &S) -> Result<String, KeyError> {
    serde_json::to_value(query)
        .map_err(|e| KeyError::Unserializable(e.to_string()))?
        .query_key()
}

/// The default key function for a [`QueryKey`] type.
pub fn default_key_fn<Q: QueryKey + 'static>() -> KeyFn<Q> {
    Arc::new(|query: &Q| query.query_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_their_own_key() {
        assert_eq!("user:1".query_key().unwrap(), "user:1");
        assert_eq!(String::from("").query_key().unwrap(), "");
        assert_eq!(json!("abc").query_key().unwrap(), "abc");
    }

    #[test]
    fn absent_query_has_empty_key() {
        let query: Option<String> = None;
        assert_eq!(query.query_key().unwrap(), "");
        assert_eq!(Some("x".to_string()).query_key().unwrap(), "x");
    }

    #[test]
    fn key_field_wins_over_stringification() {
        let query = json!({ "key": "todos", "filter": { "done": false } });
        assert_eq!(query.query_key().unwrap(), "todos");

        // Non-string key fields fall back to JSON.
        let query = json!({ "key": 7 });
        assert_eq!(query.query_key().unwrap(), r#"{"key":7}"#);
    }

    #[test]
    fn falsy_values_fail() {
        assert!(matches!(Value::Null.query_key(), Err(KeyError::Falsy(_))));
        assert!(matches!(json!(false).query_key(), Err(KeyError::Falsy(_))));
        assert!(matches!(json!(0).query_key(), Err(KeyError::Falsy(_))));
        assert!(matches!(json!(0.0).query_key(), Err(KeyError::Falsy(_))));
        assert_eq!(json!(true).query_key().unwrap(), "true");
        assert_eq!(json!(12).query_key().unwrap(), "12");
    }

    #[test]
    fn serializable_structs_use_json_rules() {
        #[derive(Serialize)]
        struct ById {
            id: u32,
        }

        #[derive(Serialize)]
        struct Keyed<'a> {
            key: &'a str,
            page: u32,
        }

        assert_eq!(json_key(&ById { id: 3 }).unwrap(), r#"{"id":3}"#);
        assert_eq!(json_key(&Keyed { key: "feed", page: 2 }).unwrap(), "feed");
        assert!(matches!(json_key(&()), Err(KeyError::Falsy(_))));
    }

    #[test]
    fn integers_stringify() {
        assert_eq!(42u64.query_key().unwrap(), "42");
        assert_eq!((-1i32).query_key().unwrap(), "-1");
    }
}
