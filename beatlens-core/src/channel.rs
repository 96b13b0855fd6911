//! Channel and source identity

use std::fmt;
use std::sync::Arc;

/// One of the three independent analysis tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Tempo,
    Key,
    Chords,
}

impl Channel {
    /// Lock acquisition order whenever more than one channel is held
    pub const ALL: [Channel; 3] = [Channel::Tempo, Channel::Key, Channel::Chords];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Tempo => "tempo",
            Channel::Key => "key",
            Channel::Chords => "chords",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque name of the playing item, compared by value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one analysis round
///
/// The generation changes on every restart of the session, including a
/// forced recalculation of the same source, so results from an earlier
/// round of the same track are stale too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub source: SourceId,
    pub generation: u64,
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_compares_by_value() {
        let a = SourceId::new(String::from("file:///music/a.flac"));
        let b: SourceId = "file:///music/a.flac".into();
        assert_eq!(a, b);
        assert_ne!(a, SourceId::new("file:///music/b.flac"));
    }

    #[test]
    fn test_ticket_generation_distinguishes_rounds() {
        let source = SourceId::new("a");
        let first = Ticket { source: source.clone(), generation: 1 };
        let second = Ticket { source, generation: 2 };
        assert_ne!(first, second);
        assert_eq!(second.to_string(), "a#2");
    }
}
