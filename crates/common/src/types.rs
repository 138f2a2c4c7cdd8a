use serde::{Deserialize, Serialize};

/// Unique identifier for an order.
///
/// Wraps the `order_uid` string from the feed payload to provide type
/// safety and prevent mixing up order identifiers with other string
/// fields (track numbers, transaction ids, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct OrderUid(String);

impl OrderUid {
    /// Creates an order uid from an existing string.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the uid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the uid is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for OrderUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderUid {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

impl From<&str> for OrderUid {
    fn from(uid: &str) -> Self {
        Self(uid.to_string())
    }
}

impl From<OrderUid> for String {
    fn from(uid: OrderUid) -> Self {
        uid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_uid_preserves_value() {
        let uid = OrderUid::new("b563feb7b2b84b6test");
        assert_eq!(uid.as_str(), "b563feb7b2b84b6test");
        assert_eq!(uid.to_string(), "b563feb7b2b84b6test");
    }

    #[test]
    fn order_uid_serializes_as_plain_string() {
        let uid = OrderUid::new("b563feb7b2b84b6test");
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"b563feb7b2b84b6test\"");
    }

    #[test]
    fn order_uid_serialization_roundtrip() {
        let uid = OrderUid::new("b563feb7b2b84b6test");
        let json = serde_json::to_string(&uid).unwrap();
        let deserialized: OrderUid = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, deserialized);
    }

    #[test]
    fn order_uid_empty_check() {
        assert!(OrderUid::default().is_empty());
        assert!(!OrderUid::new("x").is_empty());
    }
}
