//! Key paths.
//!
//! Typed paths into the state tree. Segments are keys into maps or
//! indexes into lists; the dotted-string form (`functions.0.error`) is
//! kept for display, event names, and dynamic lookups, but everything
//! internal passes `Path` values so typos fail at construction sites.

use std::fmt;

// =============================================================================
// Segments
// =============================================================================

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Key into a map value.
    Key(String),
    /// Index into a list value.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{key}"),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

// =============================================================================
// Path
// =============================================================================

/// A path into the state tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path (the whole tree).
    pub fn root() -> Self {
        Self::default()
    }

    // Known state roots.

    /// `functions` - the ordered list of plotted functions.
    pub fn functions() -> Self {
        Self::root().key("functions")
    }

    /// `controls` - the parameter name/value map.
    pub fn controls() -> Self {
        Self::root().key("controls")
    }

    /// `viewport` - the persisted domain window.
    pub fn viewport() -> Self {
        Self::root().key("viewport")
    }

    /// `graph` - grid/axes display settings.
    pub fn graph() -> Self {
        Self::root().key("graph")
    }

    /// Appends a map key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Appends a list index.
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    /// Parses a dotted path; all-digit segments become indexes.
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s.parse::<usize>() {
                Ok(index) => Segment::Index(index),
                Err(_) => Segment::Key(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Proper ancestors, nearest first, excluding the root.
    ///
    /// `functions.0.error` yields `functions.0`, then `functions`.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.segments.len()).rev().map(|n| Path {
            segments: self.segments[..n].to_vec(),
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_round_trip() {
        for text in ["functions", "functions.0.error", "controls.a", "graph.showGrid"] {
            assert_eq!(Path::parse(text).to_string(), text);
        }
    }

    #[test]
    fn test_parse_numeric_segments_are_indexes() {
        let path = Path::parse("functions.2.visible");
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("functions".to_string()),
                Segment::Index(2),
                Segment::Key("visible".to_string()),
            ]
        );
    }

    #[test]
    fn test_typed_constructors_match_parse() {
        assert_eq!(Path::functions().index(0).key("error"), Path::parse("functions.0.error"));
        assert_eq!(Path::controls().key("a"), Path::parse("controls.a"));
        assert_eq!(Path::viewport(), Path::parse("viewport"));
        assert_eq!(Path::graph().key("showAxes"), Path::parse("graph.showAxes"));
    }

    #[test]
    fn test_root() {
        assert!(Path::root().is_empty());
        assert_eq!(Path::parse(""), Path::root());
        assert_eq!(Path::root().to_string(), "");
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let path = Path::parse("functions.0.error");
        let ancestors: Vec<String> = path.ancestors().map(|p| p.to_string()).collect();
        assert_eq!(ancestors, vec!["functions.0", "functions"]);

        assert_eq!(Path::parse("functions").ancestors().count(), 0);
        assert_eq!(Path::root().ancestors().count(), 0);
    }
}
