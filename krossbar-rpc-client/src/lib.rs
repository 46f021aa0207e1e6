/*!
Asynchronous RPC client engine used by Krossbar services.

The library:
- Drives many concurrently in-flight calls through a single [completion_queue::CompletionQueue];
- Supports unary calls, server streams, client streams, bidirectional streams, and push subscriptions;
- Runs every call as a state machine, advanced by the [dispatcher::Dispatcher] on each completion,
  instead of blocking a task or a thread per call;
- Leaves the wire to a [transport::Transport] implementation.

Use [client::Client::new] to make a client and its dispatcher. Run the dispatcher with
[dispatcher::Dispatcher::run] (or `spawn`, or `run_blocking` on a dedicated thread), then issue calls
from any task or thread.

# Examples

Calls:
```no_run
use futures::StreamExt;

use krossbar_rpc_client::{
    client::Client, completion_queue::CompletionQueue, context::CallContext, transport::Transport,
};

async fn calls(transport: impl Transport + 'static, queue: CompletionQueue) {
    let (client, dispatcher) = Client::new(transport, queue);
    dispatcher.spawn();

    let call = client
        .unary::<u32, u32>("echo", &42, CallContext::new())
        .await
        .unwrap();
    println!("Unary response: {:?}", call.await);

    let mut stream = client
        .server_stream::<u32, u32>("count", &3, CallContext::new())
        .await
        .unwrap();
    while let Some(reply) = stream.next().await {
        println!("Stream response: {reply:?}");
    }

    client.shutdown();
}
```

Subscriptions:
```no_run
use std::sync::Arc;

use bson::Bson;
use krossbar_rpc_client::{client::Client, context::CallContext, subscriber::Subscriber};

struct Printer;

impl Subscriber for Printer {
    fn on_push_reply(&self, reply: &Bson) {
        println!("Push reply: {reply}")
    }
}

async fn subscribe(client: &Client) {
    let printer: Arc<dyn Subscriber> = Arc::new(Printer);
    client.set_subscriber(&printer).await;

    let subscription = client
        .subscribe("signal", &"me", CallContext::new())
        .await
        .unwrap();

    // ...
    subscription.cancel();
}
```

See `tests/` for more examples.
*/

mod calls;
mod calls_registry;
pub mod client;
pub mod completion_queue;
pub mod config;
pub mod context;
pub mod dispatcher;
mod error;
pub mod handles;
#[cfg(feature = "log-to-stdout")]
mod log_macros;
#[cfg(feature = "monitor")]
pub mod monitor;
pub mod status;
pub mod subscriber;
pub mod tag;
pub mod transport;

pub use calls::CallKind;
pub use calls_registry::EngineStats;
pub use error::*;
