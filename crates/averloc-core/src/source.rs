//! Virtual source units and data splits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder container name every corpus record uses for its class.
pub const WRAPPER: &str = "WRAPPER";

/// Prefix a class name carries once the unit id has been embedded into it.
pub const WRAPPER_PREFIX: &str = "WRAPPER_";

/// Default upper bound on the number of units dispatched together.
pub const DEFAULT_CHUNK_SIZE: usize = 3000;

/// A named partition of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Test,
    Train,
    Valid,
}

impl Split {
    /// All splits, in the order a full run loads them.
    pub const ALL: [Split; 3] = [Split::Test, Split::Train, Split::Valid];

    /// Lowercase name used in file and directory names.
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Test => "test",
            Split::Train => "train",
            Split::Valid => "valid",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown split name.
#[derive(Debug, thiserror::Error)]
#[error("unknown split '{0}' (expected test, train or valid)")]
pub struct UnknownSplit(pub String);

impl FromStr for Split {
    type Err = UnknownSplit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "test" => Ok(Split::Test),
            "train" => Ok(Split::Train),
            "valid" => Ok(Split::Valid),
            _ => Err(UnknownSplit(s.to_string())),
        }
    }
}

/// One in-memory source sample.
///
/// The text has its `WRAPPER` class renamed to `WRAPPER_<id>` so that many
/// units can be parsed into one model without their classes colliding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    id: String,
    text: String,
    split: Split,
}

impl SourceUnit {
    /// Create a unit from a raw corpus payload, embedding `id` into the
    /// placeholder class name.
    pub fn from_record(id: impl Into<String>, raw: &str, split: Split) -> Self {
        let id = id.into();
        let text = raw.replace(
            &format!("class {WRAPPER} {{"),
            &format!("class {WRAPPER_PREFIX}{id} {{"),
        );
        Self { id, text, split }
    }

    /// Create a unit whose text is used verbatim.
    pub fn new(id: impl Into<String>, text: impl Into<String>, split: Split) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            split,
        }
    }

    /// Content hash identifying this unit within its split.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Source text, with the container name already rewritten.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Split this unit was loaded from.
    pub fn split(&self) -> Split {
        self.split
    }

    /// Synthetic file name the engine reports in diagnostics.
    pub fn virtual_name(&self) -> String {
        format!("{}.java", self.id)
    }
}

/// Strip the collision-avoidance prefix from a class name.
pub fn unit_identifier(class_name: &str) -> &str {
    class_name.strip_prefix(WRAPPER_PREFIX).unwrap_or(class_name)
}

/// Partition units into ordered chunks of at most `size` elements.
///
/// A `size` of zero is treated as one.
pub fn chunked(units: Vec<SourceUnit>, size: usize) -> Vec<Vec<SourceUnit>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(units.len().div_ceil(size));
    let mut iter = units.into_iter().peekable();

    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn units(n: usize) -> Vec<SourceUnit> {
        (0..n)
            .map(|i| SourceUnit::new(format!("h{i}"), "class A {}", Split::Train))
            .collect()
    }

    #[test]
    fn test_from_record_embeds_id() {
        let unit = SourceUnit::from_record(
            "abc123",
            "class WRAPPER {\n  void f() {}\n}",
            Split::Test,
        );

        assert_eq!(unit.id(), "abc123");
        assert!(unit.text().starts_with("class WRAPPER_abc123 {"));
        assert_eq!(unit.virtual_name(), "abc123.java");
        assert_eq!(unit.split(), Split::Test);
    }

    #[test]
    fn test_unit_identifier() {
        assert_eq!(unit_identifier("WRAPPER_abc"), "abc");
        assert_eq!(unit_identifier("Plain"), "Plain");
    }

    #[test]
    fn test_split_round_trip_names() {
        for split in Split::ALL {
            assert_eq!(split.as_str().parse::<Split>().unwrap(), split);
        }
        assert_eq!("TEST".parse::<Split>().unwrap(), Split::Test);
        assert!("dev".parse::<Split>().is_err());
    }

    #[test]
    fn test_chunked_sizes() {
        let chunks = chunked(units(7000), DEFAULT_CHUNK_SIZE);
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3000, 3000, 1000]);
    }

    #[test]
    fn test_chunked_partitions_without_overlap() {
        let all = units(25);
        let expected: HashSet<_> = all.iter().map(|u| u.id().to_string()).collect();

        let chunks = chunked(all, 4);
        assert!(chunks.iter().all(|c| c.len() <= 4));

        let mut seen = HashSet::new();
        for unit in chunks.iter().flatten() {
            assert!(seen.insert(unit.id().to_string()), "duplicate {}", unit.id());
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_chunked_empty() {
        assert!(chunked(Vec::new(), 3000).is_empty());
    }
}
