use std::sync::Arc;

use bson::Bson;
#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, warn};

use super::{write_cursor::WriteCursor, CallKind, CallState, Control, Phase, ReplyChannel};
use crate::{
    status::Status,
    subscriber::SubscriberLink,
    tag::{Completion, Op, Tag},
    transport::StreamReaderWriter,
};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, warn};

/// Streamed requests, streamed replies.
///
/// Write and read halves progress independently: a write and a read may be in flight
/// at the same time, and completions are routed by their operation. The status is
/// requested once both halves are closed
pub(crate) struct BidiStreamCall {
    stream: Box<dyn StreamReaderWriter>,
    cursor: WriteCursor,
    reading: bool,
    phase: Phase,
    channel: ReplyChannel,
}

impl BidiStreamCall {
    pub fn new(
        stream: Box<dyn StreamReaderWriter>,
        payload: Arc<[Bson]>,
        channel: ReplyChannel,
    ) -> Self {
        Self {
            stream,
            cursor: WriteCursor::new(payload),
            reading: true,
            phase: Phase::Process,
            channel,
        }
    }

    fn send(&mut self, item: crate::Result<Bson>) {
        self.channel.send(item)
    }

    fn close(&mut self, status: Option<Status>) {
        if let Some(status) = status.filter(|status| !status.is_ok()) {
            self.send(Err(crate::Error::Status(status)))
        }

        self.channel.close()
    }

    /// Request the status if both halves are closed
    fn try_finish(&mut self, tag: Tag) {
        if !self.reading && self.cursor.is_closed() {
            debug!(
                "Bidi stream {tag} wrote {} messages, read side is over. Requesting status",
                self.cursor.written()
            );

            self.stream.finish(tag);
            self.phase = Phase::Finish;
        }
    }
}

impl CallState for BidiStreamCall {
    fn kind(&self) -> CallKind {
        CallKind::BidiStream
    }

    fn start(&mut self, tag: Tag) {
        self.cursor.step(self.stream.as_mut(), tag);
        self.stream.read(tag);
    }

    fn transition(&mut self, completion: &Completion, _subscriber: &SubscriberLink) -> Control {
        let tag = completion.tag;

        match (self.phase, completion.op) {
            (Phase::Process, op @ (Op::Write | Op::WritesDone)) => {
                if !completion.success {
                    warn!("Bidi stream {tag} failed to {op}. Closing write side");
                }

                if !self
                    .cursor
                    .on_completion(op, completion.success, self.stream.as_mut(), tag)
                {
                    return Control::unexpected(self.kind(), self.phase, completion);
                }

                self.try_finish(tag);
                Control::Continue
            }
            (Phase::Process, Op::Read) if self.reading => {
                if completion.success {
                    let Some(reply) = self.stream.take_reply() else {
                        return Control::Violation(format!(
                            "successful read of {tag} without a reply"
                        ));
                    };

                    self.send(Ok(reply));
                    self.stream.read(tag);
                } else {
                    debug!("Bidi stream {tag} read side is over");

                    self.reading = false;
                    self.cursor.abandon();
                    self.try_finish(tag);
                }

                Control::Continue
            }
            (Phase::Finish, Op::Finish) if completion.success => {
                let status = self.stream.status();
                debug!("Bidi stream {tag} finished: {status}");

                self.close(Some(status));
                Control::Done
            }
            _ => Control::unexpected(self.kind(), self.phase, completion),
        }
    }

    fn fail(&mut self, error: crate::Error, _subscriber: &SubscriberLink) {
        self.send(Err(error));
        self.close(None)
    }
}
