//! Absolute hierarchical resource paths.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a [`ResourcePath`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string was empty.
    #[error("path is empty")]
    Empty,

    /// The path did not start with `/`.
    #[error("path is not absolute: {0}")]
    NotAbsolute(String),

    /// The path contained a `.` or `..` segment.
    #[error("path contains a relative segment: {0}")]
    RelativeSegment(String),
}

/// An absolute path in the replica namespace, e.g. `/db/apps/site.xml`.
///
/// Paths are stored as normalized segments: repeated and trailing slashes
/// are dropped, so `/db//apps/` and `/db/apps` are the same path. Ordering
/// is segment-wise, which keeps a collection and its descendants adjacent in
/// ordered maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    /// Parses an absolute path.
    ///
    /// # Errors
    ///
    /// Fails for empty or relative input, and for `.`/`..` segments.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if !path.starts_with('/') {
            return Err(PathError::NotAbsolute(path.to_string()));
        }

        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(PathError::RelativeSegment(path.to_string()));
            }
            segments.push(segment.to_string());
        }

        Ok(Self { segments })
    }

    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns true for the root path `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Splits the path into its parent collection and leaf name.
    ///
    /// Returns `None` for the root path, which has neither.
    #[must_use]
    pub fn split(&self) -> Option<(ResourcePath, &str)> {
        let (leaf, parent) = self.segments.split_last()?;
        Some((
            ResourcePath {
                segments: parent.to_vec(),
            },
            leaf.as_str(),
        ))
    }

    /// The parent collection path, if any.
    #[must_use]
    pub fn parent(&self) -> Option<ResourcePath> {
        self.split().map(|(parent, _)| parent)
    }

    /// Appends a single segment.
    #[must_use]
    pub fn join(&self, name: &str) -> ResourcePath {
        let mut segments = self.segments.clone();
        segments.extend(name.split('/').filter(|s| !s.is_empty()).map(str::to_string));
        ResourcePath { segments }
    }

    /// Returns true if `self` equals `ancestor` or lies below it.
    #[must_use]
    pub fn starts_with(&self, ancestor: &ResourcePath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Moves `self` from below `from` to the same relative position below `to`.
    ///
    /// Returns `None` if `self` is not below (or equal to) `from`.
    #[must_use]
    pub fn rebase(&self, from: &ResourcePath, to: &ResourcePath) -> Option<ResourcePath> {
        let rest = self.segments.strip_prefix(from.segments.as_slice())?;
        let mut segments = to.segments.clone();
        segments.extend(rest.iter().cloned());
        Some(ResourcePath { segments })
    }

    /// Iterates over the ancestors of this path from the top down, ending
    /// with the path itself. The root is not included.
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = ResourcePath> + '_ {
        (1..=self.segments.len()).map(move |len| ResourcePath {
            segments: self.segments[..len].to_vec(),
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_slashes() {
        let path = ResourcePath::parse("/db//apps/").unwrap();
        assert_eq!(path.to_string(), "/db/apps");
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn parse_rejects_relative() {
        assert_eq!(ResourcePath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            ResourcePath::parse("db/apps"),
            Err(PathError::NotAbsolute(_))
        ));
        assert!(matches!(
            ResourcePath::parse("/db/../etc"),
            Err(PathError::RelativeSegment(_))
        ));
    }

    #[test]
    fn split_into_parent_and_leaf() {
        let path = ResourcePath::parse("/db/apps/site.xml").unwrap();
        let (parent, leaf) = path.split().unwrap();
        assert_eq!(parent.to_string(), "/db/apps");
        assert_eq!(leaf, "site.xml");
        assert_eq!(path.parent(), Some(parent));

        assert!(ResourcePath::root().split().is_none());
        assert_eq!(ResourcePath::root().to_string(), "/");
    }

    #[test]
    fn descendants_and_rebase() {
        let base = ResourcePath::parse("/db/a").unwrap();
        let child = ResourcePath::parse("/db/a/b/c").unwrap();
        let sibling = ResourcePath::parse("/db/ab").unwrap();

        assert!(child.starts_with(&base));
        assert!(!sibling.starts_with(&base));

        let target = ResourcePath::parse("/db/z").unwrap();
        assert_eq!(child.rebase(&base, &target).unwrap().to_string(), "/db/z/b/c");
        assert!(sibling.rebase(&base, &target).is_none());
    }

    #[test]
    fn ancestors_top_down() {
        let path = ResourcePath::parse("/db/a/b").unwrap();
        let all: Vec<String> = path.ancestors_and_self().map(|p| p.to_string()).collect();
        assert_eq!(all, vec!["/db", "/db/a", "/db/a/b"]);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn segments() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[a-z0-9_-]{1,8}", 0..6)
        }

        proptest! {
            #[test]
            fn subtree_ordering_is_contiguous(base in segments(), a in segments(), b in segments()) {
                let root = ResourcePath::parse(&format!("/{}", base.join("/"))).unwrap();
                let inside = ResourcePath::parse(&format!("{root}/{}", a.join("/"))).unwrap();
                let other = ResourcePath::parse(&format!("/{}", b.join("/"))).unwrap();

                // anything ordered between the root and one of its descendants is itself a descendant
                if root <= other && other <= inside {
                    prop_assert!(other.starts_with(&root));
                }
            }

            #[test]
            fn rebase_preserves_relative_depth(base in segments(), rest in segments(), to in segments()) {
                let from = ResourcePath::parse(&format!("/{}", base.join("/"))).unwrap();
                let path = ResourcePath::parse(&format!("{from}/{}", rest.join("/"))).unwrap();
                let target = ResourcePath::parse(&format!("/{}", to.join("/"))).unwrap();

                let moved = path.rebase(&from, &target).unwrap();
                prop_assert_eq!(moved.depth() - target.depth(), path.depth() - from.depth());
                prop_assert!(moved.starts_with(&target));
            }
        }
    }
}
