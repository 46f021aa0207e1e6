use std::sync::Arc;

use bson::Bson;

use crate::{
    tag::{Op, Tag},
    transport::StreamWriter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteSide {
    /// A write is in flight
    Writing,
    /// Writes-done is in flight
    Closing,
    /// Nothing more to write
    Closed,
}

/// Outgoing payload with a cursor into it. The cursor only moves forward, one element
/// per successful write, and never passes the end of the payload
pub(crate) struct WriteCursor {
    payload: Arc<[Bson]>,
    next: usize,
    side: WriteSide,
    abandoned: bool,
}

impl WriteCursor {
    pub fn new(payload: Arc<[Bson]>) -> Self {
        Self {
            payload,
            next: 0,
            side: WriteSide::Writing,
            abandoned: false,
        }
    }

    /// Write the next element, or close the write half if the payload is exhausted
    pub fn step<W: StreamWriter + ?Sized>(&mut self, writer: &mut W, tag: Tag) {
        match self.payload.get(self.next) {
            Some(message) => {
                writer.write(tag, message.clone());
                self.next += 1;
                self.side = WriteSide::Writing;
            }
            None => {
                writer.writes_done(tag);
                self.side = WriteSide::Closing;
            }
        }
    }

    /// Handle a write or writes-done completion. Returns `false` if the cursor
    /// doesn't expect `op`. A failed write closes the write half without writes-done
    pub fn on_completion<W: StreamWriter + ?Sized>(
        &mut self,
        op: Op,
        success: bool,
        writer: &mut W,
        tag: Tag,
    ) -> bool {
        match (self.side, op) {
            (WriteSide::Writing, Op::Write) if success && !self.abandoned => {
                self.step(writer, tag);
                true
            }
            (WriteSide::Writing, Op::Write) | (WriteSide::Closing, Op::WritesDone) => {
                self.side = WriteSide::Closed;
                true
            }
            _ => false,
        }
    }

    /// Stop writing after the in-flight operation completes
    pub fn abandon(&mut self) {
        self.abandoned = true;
    }

    pub fn is_closed(&self) -> bool {
        self.side == WriteSide::Closed
    }

    /// Number of elements handed to the transport
    pub fn written(&self) -> usize {
        self.next
    }
}
