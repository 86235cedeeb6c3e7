use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field map of a raw document as it travels to and from the store.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Store-assigned document identifier. Opaque and immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A timestamp assigned by the document store's clock.
///
/// `Pending` covers the window between an append and the store resolving
/// its server-side timestamp. Pending records sort as newer than any
/// resolved timestamp, so they surface at the top of a newest-first feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServerTime {
    Resolved(DateTime<Utc>),
    Pending,
}

impl ServerTime {
    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Resolved(t) => Some(*t),
            Self::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl Ord for ServerTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Self::Pending, Self::Pending) => Ordering::Equal,
            (Self::Pending, Self::Resolved(_)) => Ordering::Greater,
            (Self::Resolved(_), Self::Pending) => Ordering::Less,
            (Self::Resolved(a), Self::Resolved(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for ServerTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_pending_sorts_newest() {
        let t = ServerTime::Resolved(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert!(ServerTime::Pending > t);
        assert_eq!(ServerTime::Pending, ServerTime::Pending);
    }

    #[test]
    fn test_resolved_ordering() {
        let a = ServerTime::Resolved(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        let b = ServerTime::Resolved(Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
        assert!(a < b);
    }
}
