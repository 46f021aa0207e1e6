use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Opaque call identity. Correlates a completion with the call which issued the operation.
///
/// A tag is an index into the call slab plus the slot generation. The generation is bumped
/// every time a call is destroyed, so a tag of a destroyed call never matches a live call,
/// even if the slot has been reused.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    index: u32,
    generation: u32,
}

impl Tag {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index. Useful for indexing into per-call arrays
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

/// Operation a completion belongs to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Next reply has been read, or the stream is over if failed
    Read,
    /// Outgoing message has been written
    Write,
    /// Write half has been closed
    WritesDone,
    /// Final status (and a reply for single-reply calls) is available
    Finish,
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Op::Read => "read",
            Op::Write => "write",
            Op::WritesDone => "writes-done",
            Op::Finish => "finish",
        };

        f.write_str(name)
    }
}

/// Completion event pushed by a transport when an operation has finished
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub tag: Tag,
    pub op: Op,
    pub success: bool,
}

impl Completion {
    pub fn new(tag: Tag, op: Op, success: bool) -> Self {
        Self { tag, op, success }
    }
}
