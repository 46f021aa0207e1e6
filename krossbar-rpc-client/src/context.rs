use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll, Waker},
    time::{Duration, Instant},
};

#[derive(Default)]
struct Cancellation {
    cancelled: AtomicBool,
    /// Tasks waiting for the cancellation. One entry per task
    wakers: Mutex<Vec<Waker>>,
}

impl Cancellation {
    fn wakers(&self) -> MutexGuard<'_, Vec<Waker>> {
        self.wakers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Invocation-scoped call context: deadline and cancellation handle.
///
/// Cloning shares the cancellation token. Cancelling makes the transport deliver a failed
/// completion for the pending operation, which every call treats as a wind-down signal.
#[derive(Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancellation: Arc<Cancellation>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set a deadline only if the context doesn't have one
    pub(crate) fn or_timeout(self, timeout: Option<Duration>) -> Self {
        match (self.deadline, timeout) {
            (None, Some(timeout)) => self.with_timeout(timeout),
            _ => self,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| deadline <= Instant::now())
            .unwrap_or(false)
    }

    pub fn cancel(&self) {
        self.cancellation.cancelled.store(true, Ordering::Release);

        let wakers = std::mem::take(&mut *self.cancellation.wakers());
        for waker in wakers {
            waker.wake()
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.cancelled.load(Ordering::Acquire)
    }

    /// Resolves when the call is cancelled. Any number of tasks may wait at the same time
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { context: self }
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("deadline", &self.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Future returned by [CallContext::cancelled]
pub struct Cancelled<'a> {
    context: &'a CallContext,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.context.is_cancelled() {
            return Poll::Ready(());
        }

        let mut wakers = self.context.cancellation.wakers();

        // Cancellation may have happened before the lock was taken
        if self.context.is_cancelled() {
            return Poll::Ready(());
        }

        if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }

        Poll::Pending
    }
}
