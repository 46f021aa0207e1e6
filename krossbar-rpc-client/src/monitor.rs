use std::sync::atomic::{AtomicBool, Ordering};

use futures::{channel::mpsc::UnboundedSender, lock::Mutex};
#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, error};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{
    calls::CallKind,
    tag::{Completion, Op, Tag},
};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, error};

static MONITOR_ACTIVE: AtomicBool = AtomicBool::new(false);
static MONITOR_HANDLE: Lazy<Mutex<Option<UnboundedSender<MonitorMessage>>>> =
    Lazy::new(|| Mutex::new(None));

/// Monitor message. Sent for every completion the dispatcher has processed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonitorMessage {
    pub tag: Tag,
    pub op: Op,
    pub success: bool,
    /// Kind of the call which handled the completion. `None` if the call is gone
    pub kind: Option<CallKind>,
}

pub struct Monitor;

impl Monitor {
    pub async fn set(sender: UnboundedSender<MonitorMessage>) {
        debug!("Monitor connected");

        *MONITOR_HANDLE.lock().await = Some(sender);
        MONITOR_ACTIVE.store(true, Ordering::Relaxed);
    }

    pub(crate) async fn send(completion: &Completion, kind: Option<CallKind>) {
        if !MONITOR_ACTIVE.load(Ordering::Relaxed) {
            return;
        }

        let monitor_message = MonitorMessage {
            tag: completion.tag,
            op: completion.op,
            success: completion.success,
            kind,
        };

        if let Some(sender) = MONITOR_HANDLE.lock().await.as_ref() {
            if sender.unbounded_send(monitor_message).is_err() {
                MONITOR_ACTIVE.store(false, Ordering::Relaxed);

                debug!("Monitor disconnected");
            }
        } else {
            error!("No monitor handle when monitor indicator is active. Please submit a bug")
        }
    }
}
