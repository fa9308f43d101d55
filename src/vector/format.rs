//! Vector data structures for recording and replaying conversations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::{Request, Response};

/// One completed exchange, stored after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pair {
    /// The request as the caller issued it (substitution ids normalized).
    pub request: Request,
    /// The normalized response.
    pub response: Response,
}

/// On-disk element of a vector: a pair, or the end-of-conversation marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    /// A recorded exchange.
    Pair(Pair),
    /// The `{"done": true}` marker.
    End {
        /// Always `true` in a well-formed vector.
        done: bool,
    },
}

/// The ordered record of one session's conversation.
///
/// Serialized as a JSON array of pairs followed by `{"done": true}` once the
/// session has been sealed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<Entry>", into = "Vec<Entry>")]
pub struct Vector {
    pairs: Vec<Pair>,
    sealed: bool,
}

impl Vector {
    /// Creates an empty, unsealed vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. Ignored once the vector is sealed.
    pub fn push(&mut self, pair: Pair) {
        debug_assert!(!self.sealed, "push onto a sealed vector");
        if !self.sealed {
            self.pairs.push(pair);
        }
    }

    /// Marks the end of the conversation.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the end-of-conversation marker has been appended.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Recorded pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Number of recorded pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<Vec<Pair>> for Vector {
    fn from(pairs: Vec<Pair>) -> Self {
        Self { pairs, sealed: true }
    }
}

impl TryFrom<Vec<Entry>> for Vector {
    type Error = String;

    fn try_from(entries: Vec<Entry>) -> Result<Self, Self::Error> {
        let mut vector = Vector::new();
        for (index, entry) in entries.into_iter().enumerate() {
            if vector.sealed {
                return Err(format!("entry {index} follows the end-of-conversation marker"));
            }
            match entry {
                Entry::Pair(pair) => vector.pairs.push(pair),
                Entry::End { done: true } => vector.sealed = true,
                Entry::End { done: false } => {
                    return Err(format!("entry {index} is a marker without `done: true`"));
                }
            }
        }
        Ok(vector)
    }
}

impl From<Vector> for Vec<Entry> {
    fn from(vector: Vector) -> Self {
        let mut entries: Vec<Entry> = vector.pairs.into_iter().map(Entry::Pair).collect();
        if vector.sealed {
            entries.push(Entry::End { done: true });
        }
        entries
    }
}

/// The persisted document for one test suite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VectorFile {
    /// Opaque account data captured during setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Value>,
    /// Conversation recorded during suite setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Vector>,
    /// Conversations keyed by test title, in recording order.
    #[serde(default)]
    pub it: IndexMap<String, Vector>,
}
