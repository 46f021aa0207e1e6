use std::sync::Arc;

use bson::Bson;
use futures::{
    channel::{mpsc::unbounded, oneshot::channel as one_channel},
    lock::Mutex,
};
#[cfg(not(feature = "log-to-stdout"))]
use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    calls::{
        BidiStreamCall, CallKind, ChannelSink, ClientStreamCall, ReplyChannel, ServerStreamCall,
        SubscribeCall, SubscriberSink, UnaryCall as UnaryCallState,
    },
    calls_registry::{CallsRegistry, EngineStats},
    completion_queue::{CompletionQueue, Notifier},
    config::EngineConfig,
    context::CallContext,
    dispatcher::Dispatcher,
    handles::{ReplyStream, Subscription, UnaryCall},
    subscriber::Subscriber,
    transport::Transport,
};
#[cfg(feature = "log-to-stdout")]
use crate::debug;

fn encode<P: Serialize>(params: &P) -> crate::Result<Bson> {
    bson::to_bson(params).map_err(|e| crate::Error::ParamsTypeError(e.to_string()))
}

fn encode_payload<P: Serialize>(payload: &[P]) -> crate::Result<Arc<[Bson]>> {
    payload.iter().map(encode).collect()
}

/// Client handle to issue calls.
///
/// Calls return immediately. They are driven by the [Dispatcher] created alongside
/// the client, which must be running for any call to make progress.
/// The client can be cloned and used from any thread.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    notifier: Notifier,
    /// Calls registry shared with the dispatcher
    registry: Arc<Mutex<CallsRegistry>>,
    config: Arc<EngineConfig>,
}

impl Client {
    /// Make a client and its dispatcher. `transport` must push completions into `queue`
    pub fn new<T: Transport + 'static>(transport: T, queue: CompletionQueue) -> (Self, Dispatcher) {
        Self::with_config(transport, queue, EngineConfig::default())
    }

    pub fn with_config<T: Transport + 'static>(
        transport: T,
        queue: CompletionQueue,
        config: EngineConfig,
    ) -> (Self, Dispatcher) {
        let registry = Arc::new(Mutex::new(CallsRegistry::new(config.initial_capacity)));

        let client = Self {
            transport: Arc::new(transport),
            notifier: queue.notifier(),
            registry: registry.clone(),
            config: Arc::new(config),
        };

        (client, Dispatcher::new(queue, registry))
    }

    /// Single request, single reply
    pub async fn unary<P: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &P,
        context: CallContext,
    ) -> crate::Result<UnaryCall<R>> {
        let request = encode(request)?;
        let context = self.prepare_context(context)?;
        let (sender, receiver) = one_channel();

        debug!("New unary call to `{endpoint}`: {request:?}");

        let tag = self.registry.lock().await.add_call(|tag| {
            let responder = self
                .transport
                .start_unary(tag, &context, endpoint, request);

            Box::new(UnaryCallState::new(responder, sender))
        })?;

        Ok(UnaryCall::new(tag, context, receiver))
    }

    /// Single request, streamed replies
    pub async fn server_stream<P: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: &P,
        context: CallContext,
    ) -> crate::Result<ReplyStream<R>> {
        let request = encode(request)?;
        let context = self.prepare_context(context)?;
        let (sender, receiver) = unbounded();

        debug!("New server stream to `{endpoint}`: {request:?}");

        let tag = self.registry.lock().await.add_call(|tag| {
            let reader = self
                .transport
                .start_server_stream(tag, &context, endpoint, request);

            let channel = ReplyChannel::new(sender, context.clone(), CallKind::ServerStream);

            Box::new(ServerStreamCall::new(reader, ChannelSink::new(channel)))
        })?;

        Ok(ReplyStream::new(tag, context, receiver))
    }

    /// Streamed requests, single reply. `payload` is written in order, then the write
    /// half is closed. An empty payload only closes the write half
    pub async fn client_stream<P: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &[P],
        context: CallContext,
    ) -> crate::Result<UnaryCall<R>> {
        let payload = encode_payload(payload)?;
        let context = self.prepare_context(context)?;
        let (sender, receiver) = one_channel();

        debug!(
            "New client stream to `{endpoint}` with {} messages",
            payload.len()
        );

        let tag = self.registry.lock().await.add_call(|tag| {
            let writer = self.transport.start_client_stream(tag, &context, endpoint);

            Box::new(ClientStreamCall::new(writer, payload, sender))
        })?;

        Ok(UnaryCall::new(tag, context, receiver))
    }

    /// Streamed requests, streamed replies. Reading starts right away, concurrently
    /// with writing `payload`
    pub async fn bidi_stream<P: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &[P],
        context: CallContext,
    ) -> crate::Result<ReplyStream<R>> {
        let payload = encode_payload(payload)?;
        let context = self.prepare_context(context)?;
        let (sender, receiver) = unbounded();

        debug!(
            "New bidi stream to `{endpoint}` with {} messages",
            payload.len()
        );

        let tag = self.registry.lock().await.add_call(|tag| {
            let stream = self.transport.start_bidi_stream(tag, &context, endpoint);

            let channel = ReplyChannel::new(sender, context.clone(), CallKind::BidiStream);

            Box::new(BidiStreamCall::new(stream, payload, channel))
        })?;

        Ok(ReplyStream::new(tag, context, receiver))
    }

    /// Subscribe to push replies. Replies are forwarded to the subscriber registered with
    /// [Client::set_subscriber] at the moment each reply arrives
    pub async fn subscribe<P: Serialize>(
        &self,
        endpoint: &str,
        request: &P,
        context: CallContext,
    ) -> crate::Result<Subscription> {
        let request = encode(request)?;
        let context = self.prepare_context(context)?;

        debug!("New subscription to `{endpoint}`: {request:?}");

        let tag = self.registry.lock().await.add_call(|tag| {
            let reader = self
                .transport
                .start_subscribe(tag, &context, endpoint, request);

            Box::new(SubscribeCall::new(reader, SubscriberSink::new(endpoint)))
        })?;

        Ok(Subscription::new(tag, context))
    }

    /// Register push replies receiver, replacing the previous one.
    /// The client keeps only a weak reference to the subscriber
    pub async fn set_subscriber(&self, subscriber: &Arc<dyn Subscriber>) {
        self.registry.lock().await.set_subscriber(subscriber)
    }

    pub async fn unregister_subscriber(&self) {
        self.registry.lock().await.unregister_subscriber()
    }

    /// Shut down the completion queue. The dispatcher processes already delivered
    /// completions and exits
    pub fn shutdown(&self) {
        self.notifier.shutdown()
    }

    pub async fn stats(&self) -> EngineStats {
        self.registry.lock().await.stats()
    }

    fn prepare_context(&self, context: CallContext) -> crate::Result<CallContext> {
        if self.notifier.is_closed() {
            return Err(crate::Error::Shutdown);
        }

        Ok(context.or_timeout(self.config.default_timeout))
    }
}
