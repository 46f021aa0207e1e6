//! Caller side of the calls issued by the [Client](crate::client::Client)
use std::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};

use bson::Bson;
use futures::{
    channel::{mpsc::UnboundedReceiver, oneshot::Receiver as OneReceiver},
    stream::FusedStream,
    Stream,
};
use serde::de::DeserializeOwned;

use crate::{context::CallContext, tag::Tag};

fn decode<R: DeserializeOwned>(reply: Bson) -> crate::Result<R> {
    bson::from_bson(reply).map_err(|e| crate::Error::ResultTypeError(e.to_string()))
}

/// Pending single-reply call. Resolves into the decoded reply, or an error
/// if the call has failed
pub struct UnaryCall<R> {
    tag: Tag,
    context: CallContext,
    receiver: OneReceiver<crate::Result<Bson>>,
    _reply: PhantomData<fn() -> R>,
}

impl<R> UnaryCall<R> {
    pub(crate) fn new(
        tag: Tag,
        context: CallContext,
        receiver: OneReceiver<crate::Result<Bson>>,
    ) -> Self {
        Self {
            tag,
            context,
            receiver,
            _reply: PhantomData,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn cancel(&self) {
        self.context.cancel()
    }
}

impl<R: DeserializeOwned> Future for UnaryCall<R> {
    type Output = crate::Result<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result.and_then(decode)),
            // Call state is destroyed without resolving the call only if the engine is gone
            Poll::Ready(Err(_)) => Poll::Ready(Err(crate::Error::Shutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Reply stream of a streamed-reply call.
///
/// Yields replies as they arrive. A non-ok final status is yielded as the last item
pub struct ReplyStream<R> {
    tag: Tag,
    context: CallContext,
    receiver: UnboundedReceiver<crate::Result<Bson>>,
    _reply: PhantomData<fn() -> R>,
}

impl<R> ReplyStream<R> {
    pub(crate) fn new(
        tag: Tag,
        context: CallContext,
        receiver: UnboundedReceiver<crate::Result<Bson>>,
    ) -> Self {
        Self {
            tag,
            context,
            receiver,
            _reply: PhantomData,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn cancel(&self) {
        self.context.cancel()
    }
}

impl<R: DeserializeOwned> Stream for ReplyStream<R> {
    type Item = crate::Result<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        Pin::new(&mut this.receiver)
            .poll_next(cx)
            .map(|item| item.map(|result| result.and_then(decode)))
    }
}

impl<R: DeserializeOwned> FusedStream for ReplyStream<R> {
    fn is_terminated(&self) -> bool {
        self.receiver.is_terminated()
    }
}

/// Running subscription. Replies go to the registered [Subscriber](crate::subscriber::Subscriber)
#[derive(Debug, Clone)]
pub struct Subscription {
    tag: Tag,
    context: CallContext,
}

impl Subscription {
    pub(crate) fn new(tag: Tag, context: CallContext) -> Self {
        Self { tag, context }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Ask the transport to stop the subscription
    pub fn cancel(&self) {
        self.context.cancel()
    }
}
