//! Strongly-typed qualified model name wrapper.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Strongly-typed wrapper for qualified model names (`schema.name`).
///
/// Prevents accidental mixing of model names with table names, column names,
/// or other string types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    /// Create a new `ModelName`, panicking in debug builds if the name is empty.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(name: impl Into<String>) -> Self {
        let s = name.into();
        debug_assert!(!s.is_empty(), "ModelName must not be empty");
        Self(s)
    }

    /// Try to create a new `ModelName`, returning `None` if the name is empty.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Build a qualified name from a schema and a bare name.
    pub fn qualified(schema: &str, name: &str) -> Self {
        if schema.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{schema}.{name}"))
        }
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The bare name part (everything after the last `.`).
    pub fn name_part(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// The schema part (everything before the last `.`), if qualified.
    pub fn schema_part(&self) -> Option<&str> {
        self.0.rfind('.').map(|idx| &self.0[..idx])
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ModelName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for ModelName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ModelName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for ModelName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModelName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for ModelName {
    fn eq(&self, other: &String) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_parts() {
        let name = ModelName::new("staging.stg_orders");
        assert_eq!(name.name_part(), "stg_orders");
        assert_eq!(name.schema_part(), Some("staging"));
    }

    #[test]
    fn test_unqualified_parts() {
        let name = ModelName::new("orders");
        assert_eq!(name.name_part(), "orders");
        assert_eq!(name.schema_part(), None);
    }

    #[test]
    fn test_qualified_constructor() {
        assert_eq!(ModelName::qualified("analytics", "orders"), "analytics.orders");
        assert_eq!(ModelName::qualified("", "orders"), "orders");
    }

    #[test]
    fn test_display() {
        let name = ModelName::new("staging.stg_orders");
        assert_eq!(format!("{}", name), "staging.stg_orders");
    }

    #[test]
    fn test_deref_and_borrow() {
        use std::collections::HashMap;
        let name = ModelName::new("staging.stg_orders");
        assert!(name.starts_with("staging."));

        let mut map: HashMap<ModelName, i32> = HashMap::new();
        map.insert(name, 1);
        assert_eq!(map.get("staging.stg_orders"), Some(&1));
    }

    #[test]
    fn test_ordering() {
        let a = ModelName::new("analytics.a");
        let b = ModelName::new("analytics.b");
        assert!(a < b);
    }

    #[test]
    fn test_serde_roundtrip() {
        let name = ModelName::new("staging.stg_orders");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, r#""staging.stg_orders""#);
        let back: ModelName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
