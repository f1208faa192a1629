//! Slash-separated node addresses.

use std::fmt;

use super::{DirectoryError, DirectoryResult};

/// Characters a realtime-database key may never contain.
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// A validated address of a node in the directory tree.
///
/// The empty path (`""` or `"/"`) addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DirectoryPath {
    segments: Vec<String>,
}

impl DirectoryPath {
    /// Parse a `/`-separated path. Empty segments are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidPath`] if any segment is not a valid key.
    pub fn parse(raw: &str) -> DirectoryResult<Self> {
        let mut segments = Vec::new();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            if !is_valid_key(segment) {
                return Err(DirectoryError::InvalidPath {
                    path: raw.to_string(),
                    reason: format!("segment '{segment}' contains a forbidden character"),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// The root path.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Resolve a relative path (which may itself contain `/`) below this one.
    pub fn join(&self, relative: &str) -> DirectoryResult<Self> {
        let tail = Self::parse(relative)?;
        let mut segments = self.segments.clone();
        segments.extend(tail.segments);
        Ok(Self { segments })
    }

    /// Address of a single direct child.
    pub fn child(&self, key: &str) -> DirectoryResult<Self> {
        if key.is_empty() || !is_valid_key(key) {
            return Err(DirectoryError::InvalidPath {
                path: format!("{self}/{key}"),
                reason: format!("'{key}' is not a valid key"),
            });
        }
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    /// Path segments from the root down.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether this path addresses the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for DirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// Returns `true` if `key` can be used as a single path segment.
///
/// Keys may not contain `/`, `.`, `#`, `$`, `[`, `]` or ASCII control characters.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key
            .chars()
            .any(|c| c == '/' || c.is_ascii_control() || FORBIDDEN_KEY_CHARS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_empty_segments() {
        let path = DirectoryPath::parse("/users//abc/").unwrap();
        assert_eq!(path.segments(), ["users", "abc"]);
        assert_eq!(path.key(), Some("abc"));
        assert_eq!(path.to_string(), "/users/abc");
    }

    #[test]
    fn test_root_path() {
        let path = DirectoryPath::parse("/").unwrap();
        assert!(path.is_root());
        assert_eq!(path, DirectoryPath::root());
        assert_eq!(path.key(), None);
    }

    #[test]
    fn test_rejects_forbidden_characters() {
        for raw in ["users/a.b", "users/#1", "users/$x", "a[0]", "tab\there"] {
            assert!(
                matches!(
                    DirectoryPath::parse(raw),
                    Err(DirectoryError::InvalidPath { .. })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_child_rejects_nested_key() {
        let users = DirectoryPath::parse("users").unwrap();
        assert!(users.child("abc").is_ok());
        assert!(users.child("abc/name").is_err());
        assert!(users.child("").is_err());
    }

    #[test]
    fn test_join_allows_sub_paths() {
        let users = DirectoryPath::parse("users").unwrap();
        let joined = users.join("abc/status").unwrap();
        assert_eq!(joined.segments(), ["users", "abc", "status"]);
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("0190d2c4e5f67a8b"));
        assert!(is_valid_key("José"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("a/b"));
    }
}
