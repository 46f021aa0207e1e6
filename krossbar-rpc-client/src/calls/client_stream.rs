use std::sync::Arc;

use bson::Bson;
#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, warn};

use super::{
    final_reply, write_cursor::WriteCursor, CallKind, CallState, Control, Phase, ReplySender,
};
use crate::{
    subscriber::SubscriberLink,
    tag::{Completion, Op, Tag},
    transport::StreamWriter,
};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, warn};

/// Streamed requests, single reply.
///
/// Writes the payload one element per completion, then closes the write half,
/// then requests the final status and the reply
pub(crate) struct ClientStreamCall {
    writer: Box<dyn StreamWriter>,
    cursor: WriteCursor,
    phase: Phase,
    result: Option<ReplySender>,
}

impl ClientStreamCall {
    pub fn new(writer: Box<dyn StreamWriter>, payload: Arc<[Bson]>, result: ReplySender) -> Self {
        Self {
            writer,
            cursor: WriteCursor::new(payload),
            phase: Phase::Process,
            result: Some(result),
        }
    }

    fn resolve(&mut self, result: crate::Result<Bson>) {
        if let Some(sender) = self.result.take() {
            if sender.send(result).is_err() {
                warn!("User dropped client stream handle. Failed to send a response")
            }
        }
    }
}

impl CallState for ClientStreamCall {
    fn kind(&self) -> CallKind {
        CallKind::ClientStream
    }

    fn start(&mut self, tag: Tag) {
        self.cursor.step(self.writer.as_mut(), tag)
    }

    fn transition(&mut self, completion: &Completion, _subscriber: &SubscriberLink) -> Control {
        let tag = completion.tag;

        match (self.phase, completion.op) {
            (Phase::Process, op @ (Op::Write | Op::WritesDone)) => {
                if !completion.success {
                    warn!("Client stream {tag} failed to {op}. Finishing");
                }

                if !self
                    .cursor
                    .on_completion(op, completion.success, self.writer.as_mut(), tag)
                {
                    return Control::unexpected(self.kind(), self.phase, completion);
                }

                if self.cursor.is_closed() {
                    debug!(
                        "Client stream {tag} wrote {} messages. Requesting status",
                        self.cursor.written()
                    );

                    self.writer.finish(tag);
                    self.phase = Phase::Finish;
                }

                Control::Continue
            }
            (Phase::Finish, Op::Finish) if completion.success => {
                let status = self.writer.status();
                debug!("Client stream {tag} finished: {status}");

                let reply = self.writer.take_reply();
                self.resolve(final_reply(status, reply));

                Control::Done
            }
            _ => Control::unexpected(self.kind(), self.phase, completion),
        }
    }

    fn fail(&mut self, error: crate::Error, _subscriber: &SubscriberLink) {
        self.resolve(Err(error))
    }
}
