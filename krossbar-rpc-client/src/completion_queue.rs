use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
    StreamExt,
};
#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, trace};

use crate::tag::{Completion, Op, Tag};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, trace};

/// Completion queue. Transports push completions via a [Notifier], the dispatcher pulls them.
///
/// Events are delivered in the order they were pushed, which is the completion order.
/// The queue doesn't interpret tags.
pub struct CompletionQueue {
    sender: UnboundedSender<Completion>,
    receiver: UnboundedReceiver<Completion>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self { sender, receiver }
    }

    /// Push handle for a transport
    pub fn notifier(&self) -> Notifier {
        Notifier {
            sender: self.sender.clone(),
        }
    }

    /// Wait for the next completion.
    /// Returns `None` after the queue has been shut down and all buffered events drained
    pub async fn next(&mut self) -> Option<Completion> {
        self.receiver.next().await
    }

    /// Stop accepting new completions. Already pushed events will still be delivered
    pub fn shutdown(&self) {
        debug!("Shutting down completion queue");
        self.sender.close_channel()
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Push side of a [CompletionQueue]. Can be cloned and used from any thread
#[derive(Clone)]
pub struct Notifier {
    sender: UnboundedSender<Completion>,
}

impl Notifier {
    /// Notify that `op` of the call `tag` has finished.
    /// Returns `false` if the queue is shut down and the event is discarded
    pub fn push(&self, tag: Tag, op: Op, success: bool) -> bool {
        trace!("Completion {op} for {tag}: {success}");

        self.sender
            .unbounded_send(Completion::new(tag, op, success))
            .is_ok()
    }

    /// Shut down the queue. See [CompletionQueue::shutdown]
    pub fn shutdown(&self) {
        debug!("Shutting down completion queue");
        self.sender.close_channel()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
