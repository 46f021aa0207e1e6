use std::sync::Arc;

use futures::lock::Mutex;
#[cfg(not(feature = "log-to-stdout"))]
use log::{info, trace};

use crate::{
    calls_registry::{CallsRegistry, EngineStats},
    completion_queue::CompletionQueue,
};
#[cfg(feature = "log-to-stdout")]
use crate::{info, trace};

/// Completion loop. Pulls completions from the queue and routes each one to the call
/// it's tagged with.
///
/// The dispatcher owns its queue, so only one loop can ever service a queue. All call
/// transitions run inside the loop, one at a time.
pub struct Dispatcher {
    queue: CompletionQueue,
    /// Calls registry shared with the client
    registry: Arc<Mutex<CallsRegistry>>,
}

impl Dispatcher {
    pub(crate) fn new(queue: CompletionQueue, registry: Arc<Mutex<CallsRegistry>>) -> Self {
        Self { queue, registry }
    }

    /// Process completions until the queue is shut down and drained.
    /// Calls still alive after that are failed with [crate::Error::Shutdown]
    pub async fn run(mut self) {
        while self.process_next().await {}

        info!("Completion queue is shutting down");
        self.registry.lock().await.clear_pending_calls();
    }

    /// Wait for a single completion and dispatch it.
    /// Returns `false` if the queue is shut down and drained
    pub async fn process_next(&mut self) -> bool {
        let Some(completion) = self.queue.next().await else {
            return false;
        };

        trace!("Dispatching {completion:?}");

        #[allow(unused_variables)]
        let kind = self.registry.lock().await.dispatch(completion);

        #[cfg(feature = "monitor")]
        crate::monitor::Monitor::send(&completion, kind).await;

        true
    }

    /// Run the loop on the current thread, blocking it until the queue is shut down
    pub fn run_blocking(self) {
        futures::executor::block_on(self.run())
    }

    /// Run the loop as a tokio task
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn stats(&self) -> EngineStats {
        self.registry.lock().await.stats()
    }
}
