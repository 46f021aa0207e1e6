#![allow(dead_code)]

pub mod recording_subscriber;
pub mod scripted_transport;

use krossbar_rpc_client::{
    client::Client, completion_queue::CompletionQueue, config::EngineConfig,
    dispatcher::Dispatcher,
};

use scripted_transport::ScriptedTransport;

pub fn setup() -> (Client, Dispatcher, ScriptedTransport) {
    setup_with_config(EngineConfig::default())
}

pub fn setup_with_config(config: EngineConfig) -> (Client, Dispatcher, ScriptedTransport) {
    let queue = CompletionQueue::new();
    let transport = ScriptedTransport::new(queue.notifier());
    let (client, dispatcher) = Client::with_config(transport.clone(), queue, config);

    (client, dispatcher, transport)
}
