use serde::{Deserialize, Serialize};

/// The authenticated user's minimal profile.
///
/// An empty `id` is the signed-out sentinel: no session exists. The value
/// is always replaced wholesale (never field-by-field from outside the
/// session tracker), so readers can never observe a half-written identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Identity {
    /// Opaque account identifier, stable per account. Empty when signed out.
    pub id: String,
    /// Display name. May be empty even while signed in.
    pub display_name: String,
    /// Avatar URL. May be empty even while signed in.
    pub photo_url: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, photo_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            photo_url: photo_url.into(),
        }
    }

    /// The signed-out sentinel.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_signed_out(&self) -> bool {
        self.id.is_empty()
    }

    /// Replace only the profile fields, preserving the account id.
    ///
    /// Used for out-of-band profile refreshes (e.g. after registration
    /// finishes uploading the avatar).
    pub fn merge_profile(&self, display_name: &str, photo_url: &str) -> Self {
        Self {
            id: self.id.clone(),
            display_name: display_name.to_string(),
            photo_url: photo_url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_out_sentinel() {
        let id = Identity::signed_out();
        assert!(id.is_signed_out());
        assert!(id.display_name.is_empty());
    }

    #[test]
    fn test_merge_profile_preserves_id() {
        let id = Identity::new("acct-1", "old", "");
        let merged = id.merge_profile("new name", "https://cdn/ava.png");
        assert_eq!(merged.id, "acct-1");
        assert_eq!(merged.display_name, "new name");
        assert_eq!(merged.photo_url, "https://cdn/ava.png");
    }
}
