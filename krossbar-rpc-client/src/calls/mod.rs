//! Per-call state machines.
//!
//! A call is created by the [Client](crate::client::Client), which performs its first
//! transition. After that it's driven only by the dispatcher: one
//! [CallState::transition] per completion, never concurrently. A transition issues the
//! next non-blocking operation, or returns [Control::Done] when the call is over.
use std::fmt::Display;

use bson::Bson;
use futures::channel::{mpsc::UnboundedSender, oneshot::Sender as OneSender};
#[cfg(not(feature = "log-to-stdout"))]
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    context::CallContext,
    status::Status,
    subscriber::SubscriberLink,
    tag::{Completion, Tag},
};
#[cfg(feature = "log-to-stdout")]
use crate::warn;

mod bidi_stream;
mod client_stream;
mod server_stream;
mod unary;
mod write_cursor;

pub(crate) use bidi_stream::BidiStreamCall;
pub(crate) use client_stream::ClientStreamCall;
pub(crate) use server_stream::{ChannelSink, ServerStreamCall, SubscribeCall, SubscriberSink};
pub(crate) use unary::UnaryCall;

/// Sender of a single-reply call result
pub(crate) type ReplySender = OneSender<crate::Result<Bson>>;
/// Sender of a streamed call replies
pub(crate) type StreamSender = UnboundedSender<crate::Result<Bson>>;

/// Reply stream of a streamed call, seen from the call side.
/// Once the caller drops the stream, the call is cancelled
pub(crate) struct ReplyChannel {
    sender: StreamSender,
    context: CallContext,
    kind: CallKind,
}

impl ReplyChannel {
    pub fn new(sender: StreamSender, context: CallContext, kind: CallKind) -> Self {
        Self {
            sender,
            context,
            kind,
        }
    }

    pub fn send(&mut self, item: crate::Result<Bson>) {
        if self.sender.unbounded_send(item).is_err() && !self.context.is_cancelled() {
            warn!("User dropped {} handle. Cancelling the call", self.kind);
            self.context.cancel()
        }
    }

    pub fn close(&mut self) {
        self.sender.close_channel()
    }
}

/// Call interaction shape
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Unary,
    ServerStream,
    ClientStream,
    BidiStream,
    Subscribe,
}

impl Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallKind::Unary => "unary",
            CallKind::ServerStream => "server-stream",
            CallKind::ClientStream => "client-stream",
            CallKind::BidiStream => "bidi-stream",
            CallKind::Subscribe => "subscribe",
        };

        f.write_str(name)
    }
}

/// Coarse call lifecycle stage. Terminal stage is the call removal from the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Operations are still pending
    Process,
    /// Waiting for the final status
    Finish,
}

/// Transition result
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Control {
    /// More completions are expected
    Continue,
    /// The call is over and has notified its caller. Destroy it
    Done,
    /// The completion can't be legally received in the current phase. Destroy the call
    Violation(String),
}

impl Control {
    pub fn unexpected(kind: CallKind, phase: Phase, completion: &Completion) -> Self {
        Control::Violation(format!(
            "unexpected {} completion (success: {}) for a {kind} call in {phase:?} phase",
            completion.op, completion.success
        ))
    }
}

pub(crate) trait CallState: Send {
    fn kind(&self) -> CallKind;

    /// First transition. Called once by the client right after the call got its tag
    fn start(&mut self, tag: Tag);

    /// Handle a completion for this call
    fn transition(&mut self, completion: &Completion, subscriber: &SubscriberLink) -> Control;

    /// Notify the caller the call is destroyed without a regular finish
    fn fail(&mut self, error: crate::Error, subscriber: &SubscriberLink);
}

/// Result of a single-reply call after a successful finish
pub(crate) fn final_reply(status: Status, reply: Option<Bson>) -> crate::Result<Bson> {
    if !status.is_ok() {
        return Err(crate::Error::Status(status));
    }

    reply.ok_or_else(|| {
        crate::Error::ProtocolError("call finished with ok status, but without a reply".into())
    })
}
