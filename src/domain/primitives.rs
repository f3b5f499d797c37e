//! Domain primitives: TimeMs, UserId, TransactionId, GroupId, CurrencyCode.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Get the underlying milliseconds value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// User identifier, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a UserId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction document identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Create a TransactionId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        TransactionId(id.into())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group document identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    /// Create a GroupId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        GroupId(id.into())
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency code, either legal tender ("USD") or an emoji unit ("BEER").
///
/// Legal and emoji balances are tracked independently and never summed
/// together; the code string is the map key everywhere a balance is stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyCode(pub String);

/// The non-legal units of account tracked alongside money.
const EMOJI_CURRENCIES: &[&str] = &["BEER", "PIZZA", "COFFEE", "COOKIE", "HUG", "FLOWER"];

/// Classification of a currency code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    /// Legal tender with decimal amounts.
    Legal,
    /// Emoji currency with whole-number counts.
    Emoji,
}

impl CurrencyCode {
    /// Create a CurrencyCode from a string, uppercased.
    pub fn new(code: impl Into<String>) -> Self {
        CurrencyCode(code.into().to_uppercase())
    }

    /// Get the code as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify this code as legal tender or an emoji unit.
    pub fn kind(&self) -> CurrencyKind {
        if EMOJI_CURRENCIES.contains(&self.0.as_str()) {
            CurrencyKind::Emoji
        } else {
            CurrencyKind::Legal
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_kind_classification() {
        assert_eq!(CurrencyCode::new("USD").kind(), CurrencyKind::Legal);
        assert_eq!(CurrencyCode::new("EUR").kind(), CurrencyKind::Legal);
        assert_eq!(CurrencyCode::new("BEER").kind(), CurrencyKind::Emoji);
        assert_eq!(CurrencyCode::new("PIZZA").kind(), CurrencyKind::Emoji);
    }

    #[test]
    fn test_currency_code_uppercased() {
        assert_eq!(CurrencyCode::new("beer").as_str(), "BEER");
        assert_eq!(CurrencyCode::new("usd").as_str(), "USD");
    }

    #[test]
    fn test_user_id_display() {
        let user = UserId::new("alice");
        assert_eq!(user.to_string(), "alice");
    }

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_currency_serialization() {
        let code = CurrencyCode::new("USD");
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"USD\"");
    }
}
