use bson::Bson;
#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, info};

use super::{CallKind, CallState, Control, Phase, ReplyChannel};
use crate::{
    status::{Status, StatusCode},
    subscriber::SubscriberLink,
    tag::{Completion, Op, Tag},
    transport::StreamReader,
};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, info};

/// Destination of the replies read by a [ReadStreamCall]
pub(crate) trait StreamSink: Send {
    const KIND: CallKind;

    fn deliver(&mut self, reply: Bson, subscriber: &SubscriberLink);

    fn finish(&mut self, status: Status, subscriber: &SubscriberLink);

    fn fail(&mut self, error: crate::Error, subscriber: &SubscriberLink);
}

/// Replies are sent to the caller reply stream
pub(crate) struct ChannelSink {
    channel: ReplyChannel,
}

impl ChannelSink {
    pub fn new(channel: ReplyChannel) -> Self {
        Self { channel }
    }

    fn send(&mut self, item: crate::Result<Bson>) {
        self.channel.send(item)
    }
}

impl StreamSink for ChannelSink {
    const KIND: CallKind = CallKind::ServerStream;

    fn deliver(&mut self, reply: Bson, _subscriber: &SubscriberLink) {
        self.send(Ok(reply))
    }

    fn finish(&mut self, status: Status, _subscriber: &SubscriberLink) {
        if !status.is_ok() {
            self.send(Err(crate::Error::Status(status)))
        }

        self.channel.close()
    }

    fn fail(&mut self, error: crate::Error, _subscriber: &SubscriberLink) {
        self.send(Err(error));
        self.channel.close()
    }
}

/// Replies are pushed to the registered [Subscriber](crate::subscriber::Subscriber)
pub(crate) struct SubscriberSink {
    endpoint: String,
}

impl SubscriberSink {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
        }
    }
}

impl StreamSink for SubscriberSink {
    const KIND: CallKind = CallKind::Subscribe;

    fn deliver(&mut self, reply: Bson, subscriber: &SubscriberLink) {
        if !subscriber.forward(&reply) {
            debug!("Dropping `{}` push reply. No subscriber", self.endpoint)
        }
    }

    fn finish(&mut self, status: Status, subscriber: &SubscriberLink) {
        info!("Subscription to `{}` finished: {status}", self.endpoint);
        subscriber.finished(&status)
    }

    fn fail(&mut self, error: crate::Error, subscriber: &SubscriberLink) {
        let status = match error {
            crate::Error::Status(status) => status,
            crate::Error::Shutdown => Status::cancelled("completion queue is shut down"),
            e => Status::new(StatusCode::Internal, e.to_string()),
        };

        self.finish(status, subscriber)
    }
}

/// Single request, streamed replies.
///
/// Reads until a read fails, which means the stream is exhausted or broken,
/// then requests the final status
pub(crate) struct ReadStreamCall<S: StreamSink> {
    reader: Box<dyn StreamReader>,
    sink: S,
    phase: Phase,
}

pub(crate) type ServerStreamCall = ReadStreamCall<ChannelSink>;
pub(crate) type SubscribeCall = ReadStreamCall<SubscriberSink>;

impl<S: StreamSink> ReadStreamCall<S> {
    pub fn new(reader: Box<dyn StreamReader>, sink: S) -> Self {
        Self {
            reader,
            sink,
            phase: Phase::Process,
        }
    }
}

impl<S: StreamSink> CallState for ReadStreamCall<S> {
    fn kind(&self) -> CallKind {
        S::KIND
    }

    fn start(&mut self, tag: Tag) {
        self.reader.read(tag)
    }

    fn transition(&mut self, completion: &Completion, subscriber: &SubscriberLink) -> Control {
        let tag = completion.tag;

        match (self.phase, completion.op) {
            (Phase::Process, Op::Read) if completion.success => {
                let Some(reply) = self.reader.take_reply() else {
                    return Control::Violation(format!("successful read of {tag} without a reply"));
                };

                self.sink.deliver(reply, subscriber);
                self.reader.read(tag);

                Control::Continue
            }
            (Phase::Process, Op::Read) => {
                debug!("{} {tag} read side is over. Requesting status", S::KIND);

                self.reader.finish(tag);
                self.phase = Phase::Finish;

                Control::Continue
            }
            (Phase::Finish, Op::Finish) if completion.success => {
                let status = self.reader.status();
                self.sink.finish(status, subscriber);

                Control::Done
            }
            _ => Control::unexpected(self.kind(), self.phase, completion),
        }
    }

    fn fail(&mut self, error: crate::Error, subscriber: &SubscriberLink) {
        self.sink.fail(error, subscriber)
    }
}
