use std::sync::{Arc, Weak};

use bson::Bson;
#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, trace};

use crate::status::Status;
#[cfg(feature = "log-to-stdout")]
use crate::{debug, trace};

/// Receiver of push replies from subscribe calls.
///
/// Methods are invoked synchronously from the dispatcher. They must not block
/// or call back into the client.
pub trait Subscriber: Send + Sync {
    fn on_push_reply(&self, reply: &Bson);

    /// A subscribe call has finished. No more replies will be pushed for it
    fn on_subscription_finished(&self, _status: &Status) {}
}

/// Weak link to the registered subscriber. The engine never keeps a subscriber alive
#[derive(Default)]
pub(crate) struct SubscriberLink {
    subscriber: Option<Weak<dyn Subscriber>>,
}

impl SubscriberLink {
    /// Register a subscriber, replacing the previous one
    pub fn set(&mut self, subscriber: &Arc<dyn Subscriber>) {
        debug!("New subscriber registered");
        self.subscriber = Some(Arc::downgrade(subscriber));
    }

    pub fn unregister(&mut self) {
        debug!("Subscriber unregistered");
        self.subscriber = None;
    }

    fn upgrade(&self) -> Option<Arc<dyn Subscriber>> {
        self.subscriber.as_ref().and_then(Weak::upgrade)
    }

    /// Forward a reply. Returns `false` if there's no live subscriber
    pub fn forward(&self, reply: &Bson) -> bool {
        match self.upgrade() {
            Some(subscriber) => {
                subscriber.on_push_reply(reply);
                true
            }
            None => {
                trace!("No subscriber to forward a push reply to");
                false
            }
        }
    }

    pub fn finished(&self, status: &Status) {
        if let Some(subscriber) = self.upgrade() {
            subscriber.on_subscription_finished(status)
        }
    }
}
