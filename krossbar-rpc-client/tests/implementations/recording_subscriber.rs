use std::sync::Mutex;

use bson::Bson;
use krossbar_rpc_client::{status::Status, subscriber::Subscriber};

/// Subscriber which keeps everything it receives
#[derive(Default)]
pub struct RecordingSubscriber {
    replies: Mutex<Vec<Bson>>,
    finished: Mutex<Vec<Status>>,
}

impl RecordingSubscriber {
    pub fn replies(&self) -> Vec<Bson> {
        self.replies.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<Status> {
        self.finished.lock().unwrap().clone()
    }
}

impl Subscriber for RecordingSubscriber {
    fn on_push_reply(&self, reply: &Bson) {
        self.replies.lock().unwrap().push(reply.clone())
    }

    fn on_subscription_finished(&self, status: &Status) {
        self.finished.lock().unwrap().push(status.clone())
    }
}
