//! Transport capability.
//!
//! A transport owns the wire: channel establishment, credentials and message encoding.
//! The engine only asks it to start calls and to issue operations. Every operation pushes
//! exactly one [Completion](crate::tag::Completion) carrying the call tag into the
//! [Notifier](crate::completion_queue::Notifier) the transport has been created with.
//! Operations must not block.
//!
//! Cancelling a [CallContext] must eventually make the transport fail the pending operation
//! of the call with `success = false`.
use bson::Bson;

use crate::{context::CallContext, status::Status, tag::Tag};

/// Operations common to all call handles
pub trait Responder: Send {
    /// Request final status. Pushes [Op::Finish](crate::tag::Op::Finish)
    fn finish(&mut self, tag: Tag);

    /// Final status. Valid after the finish completion
    fn status(&mut self) -> Status;

    /// Take the last received reply. For streaming reads it's the reply of the last
    /// successful read, for single-reply calls it's the reply delivered with the finish
    fn take_reply(&mut self) -> Option<Bson>;
}

/// Handle of a call which reads a reply stream
pub trait StreamReader: Responder {
    /// Read the next reply. Pushes [Op::Read](crate::tag::Op::Read), failed if
    /// the stream is over
    fn read(&mut self, tag: Tag);
}

/// Handle of a call which writes a request stream
pub trait StreamWriter: Responder {
    /// Write the next request. Pushes [Op::Write](crate::tag::Op::Write)
    fn write(&mut self, tag: Tag, message: Bson);

    /// Close the write half. Pushes [Op::WritesDone](crate::tag::Op::WritesDone)
    fn writes_done(&mut self, tag: Tag);
}

/// Handle of a bidirectional call
pub trait StreamReaderWriter: StreamReader + StreamWriter {}

impl<T: StreamReader + StreamWriter> StreamReaderWriter for T {}

/// Transport capability used by the [Client](crate::client::Client).
///
/// Start methods bind `tag` to the new call and return immediately. Starting a call
/// doesn't produce a completion by itself.
pub trait Transport: Send + Sync {
    fn start_unary(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
        request: Bson,
    ) -> Box<dyn Responder>;

    fn start_server_stream(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
        request: Bson,
    ) -> Box<dyn StreamReader>;

    fn start_client_stream(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
    ) -> Box<dyn StreamWriter>;

    fn start_bidi_stream(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
    ) -> Box<dyn StreamReaderWriter>;

    /// Same shape as a server stream
    fn start_subscribe(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
        request: Bson,
    ) -> Box<dyn StreamReader>;
}
