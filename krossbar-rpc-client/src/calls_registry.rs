use std::sync::Arc;

#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};

use crate::{
    calls::{CallKind, CallState, Control},
    subscriber::{Subscriber, SubscriberLink},
    tag::{Completion, Tag},
};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, error, info, trace};

/// Engine counters. `started == finished + active` always holds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Calls created
    pub started: u64,
    /// Calls destroyed
    pub finished: u64,
    /// Calls alive
    pub active: usize,
    /// Completions for calls which don't exist anymore
    pub stale_completions: u64,
    /// Completions a call couldn't legally receive
    pub protocol_violations: u64,
}

struct Slot {
    generation: u32,
    call: Option<Box<dyn CallState>>,
}

/// A slab of live calls, indexed by [Tag].
///
/// A call is reachable from the registry from its start until its terminal transition.
/// Releasing a slot bumps its generation, which invalidates every tag issued for it
pub(crate) struct CallsRegistry {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    /// Current push replies receiver
    subscriber: SubscriberLink,
    stats: EngineStats,
    /// Set once the dispatcher has cleared the calls. No call can be added after that
    shut_down: bool,
}

impl CallsRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity),
            subscriber: SubscriberLink::default(),
            stats: EngineStats::default(),
            shut_down: false,
        }
    }

    /// Add a new call. `make_call` receives the tag of the call, and must return
    /// the call state, which is then started.
    /// Fails with [crate::Error::Shutdown] once pending calls are cleared
    pub fn add_call<F>(&mut self, make_call: F) -> crate::Result<Tag>
    where
        F: FnOnce(Tag) -> Box<dyn CallState>,
    {
        if self.shut_down {
            debug!("Rejecting a new call. Calls registry is shut down");
            return Err(crate::Error::Shutdown);
        }

        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    call: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let tag = Tag::new(index, slot.generation);

        let mut call = make_call(tag);
        trace!("Add new {} call {tag}", call.kind());

        call.start(tag);
        slot.call = Some(call);

        self.stats.started += 1;
        self.stats.active += 1;

        Ok(tag)
    }

    /// Route a completion to its call. Returns the kind of the call which handled it,
    /// or `None` if the call doesn't exist
    pub fn dispatch(&mut self, completion: Completion) -> Option<CallKind> {
        let tag = completion.tag;

        let call = match self.slots.get_mut(tag.index()) {
            Some(Slot {
                generation,
                call: Some(call),
            }) if *generation == tag.generation() => call,
            _ => {
                error!(
                    "Received {} completion for a destroyed call {tag}. Please submit a bug",
                    completion.op
                );

                self.stats.stale_completions += 1;
                return None;
            }
        };

        let kind = call.kind();

        match call.transition(&completion, &self.subscriber) {
            Control::Continue => {}
            Control::Done => {
                debug!("{kind} call {tag} is over");
                self.release(tag);
            }
            Control::Violation(reason) => {
                error!("Destroying {kind} call {tag}: {reason}. Please submit a bug");

                call.fail(crate::Error::ProtocolError(reason), &self.subscriber);
                self.stats.protocol_violations += 1;
                self.release(tag);
            }
        }

        Some(kind)
    }

    /// Destroy all live calls, failing them with [crate::Error::Shutdown].
    /// New calls are rejected afterwards
    pub fn clear_pending_calls(&mut self) {
        self.shut_down = true;
        info!("Clearing {} pending calls", self.stats.active);

        let mut cleared = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(mut call) = slot.call.take() {
                call.fail(crate::Error::Shutdown, &self.subscriber);
                cleared.push(Tag::new(index as u32, slot.generation));
            }
        }

        for tag in cleared {
            self.release(tag)
        }
    }

    pub fn set_subscriber(&mut self, subscriber: &Arc<dyn Subscriber>) {
        self.subscriber.set(subscriber)
    }

    pub fn unregister_subscriber(&mut self) {
        self.subscriber.unregister()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    fn release(&mut self, tag: Tag) {
        let slot = &mut self.slots[tag.index()];

        slot.call = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(tag.index() as u32);

        self.stats.finished += 1;
        self.stats.active -= 1;
    }
}
