#[cfg(not(feature = "log-to-stdout"))]
use log::{debug, warn};

use super::{final_reply, CallKind, CallState, Control, Phase, ReplySender};
use crate::{
    subscriber::SubscriberLink,
    tag::{Completion, Op, Tag},
    transport::Responder,
};
#[cfg(feature = "log-to-stdout")]
use crate::{debug, warn};

/// Single request, single reply. Expects exactly one finish completion
pub(crate) struct UnaryCall {
    responder: Box<dyn Responder>,
    result: Option<ReplySender>,
}

impl UnaryCall {
    pub fn new(responder: Box<dyn Responder>, result: ReplySender) -> Self {
        Self {
            responder,
            result: Some(result),
        }
    }

    fn resolve(&mut self, result: crate::Result<bson::Bson>) {
        if let Some(sender) = self.result.take() {
            if sender.send(result).is_err() {
                warn!("User dropped unary call handle. Failed to send a response")
            }
        }
    }
}

impl CallState for UnaryCall {
    fn kind(&self) -> CallKind {
        CallKind::Unary
    }

    fn start(&mut self, tag: Tag) {
        self.responder.finish(tag)
    }

    fn transition(&mut self, completion: &Completion, _subscriber: &SubscriberLink) -> Control {
        if completion.op != Op::Finish {
            return Control::unexpected(self.kind(), Phase::Process, completion);
        }

        // Failed finish means the finish notification itself couldn't be delivered
        if !completion.success {
            return Control::Violation(format!(
                "finish of a unary call {} failed",
                completion.tag
            ));
        }

        let status = self.responder.status();
        debug!("Unary call {} finished: {status}", completion.tag);

        let reply = self.responder.take_reply();
        self.resolve(final_reply(status, reply));

        Control::Done
    }

    fn fail(&mut self, error: crate::Error, _subscriber: &SubscriberLink) {
        self.resolve(Err(error))
    }
}
