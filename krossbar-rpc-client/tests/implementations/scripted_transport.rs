use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bson::Bson;
use krossbar_rpc_client::{
    completion_queue::Notifier,
    context::CallContext,
    status::Status,
    tag::{Op, Tag},
    transport::{Responder, StreamReader, StreamReaderWriter, StreamWriter, Transport},
};

/// Operation the engine has issued to the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Issued {
    Start(String),
    Read,
    Write(Bson),
    WritesDone,
    Finish,
}

#[derive(Default)]
struct Script {
    journal: Vec<(Tag, Issued)>,
    contexts: HashMap<Tag, CallContext>,
    replies: HashMap<Tag, Bson>,
    statuses: HashMap<Tag, Status>,
}

/// In-memory transport. Records every operation the engine issues, and leaves it to the
/// test to complete them
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    notifier: Notifier,
}

impl ScriptedTransport {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            notifier,
        }
    }

    /// Operations issued for `tag`, in order
    pub fn journal(&self, tag: Tag) -> Vec<Issued> {
        self.script
            .lock()
            .unwrap()
            .journal
            .iter()
            .filter(|(t, _)| *t == tag)
            .map(|(_, issued)| issued.clone())
            .collect()
    }

    /// All operations issued, in order
    pub fn full_journal(&self) -> Vec<(Tag, Issued)> {
        self.script.lock().unwrap().journal.clone()
    }

    pub fn context(&self, tag: Tag) -> CallContext {
        self.script.lock().unwrap().contexts[&tag].clone()
    }

    pub fn push(&self, tag: Tag, op: Op, success: bool) {
        assert!(self.notifier.push(tag, op, success));
    }

    /// Complete a pending read with a reply
    pub fn reply(&self, tag: Tag, reply: impl Into<Bson>) {
        self.script
            .lock()
            .unwrap()
            .replies
            .insert(tag, reply.into());

        self.push(tag, Op::Read, true)
    }

    /// Fail a pending read: the stream is over
    pub fn end_stream(&self, tag: Tag) {
        self.push(tag, Op::Read, false)
    }

    pub fn complete_write(&self, tag: Tag, success: bool) {
        self.push(tag, Op::Write, success)
    }

    pub fn complete_writes_done(&self, tag: Tag) {
        self.push(tag, Op::WritesDone, true)
    }

    /// Complete a pending finish with a status, and a reply for single-reply calls
    pub fn finish(&self, tag: Tag, status: Status, reply: Option<Bson>) {
        {
            let mut script = self.script.lock().unwrap();

            script.statuses.insert(tag, status);
            if let Some(reply) = reply {
                script.replies.insert(tag, reply);
            }
        }

        self.push(tag, Op::Finish, true)
    }

    fn open(&self, tag: Tag, context: &CallContext, kind: &str, endpoint: &str) -> ScriptedCall {
        let mut script = self.script.lock().unwrap();

        script
            .journal
            .push((tag, Issued::Start(format!("{kind}:{endpoint}"))));
        script.contexts.insert(tag, context.clone());

        ScriptedCall {
            tag,
            script: self.script.clone(),
        }
    }
}

impl Transport for ScriptedTransport {
    fn start_unary(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
        _request: Bson,
    ) -> Box<dyn Responder> {
        Box::new(self.open(tag, context, "unary", endpoint))
    }

    fn start_server_stream(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
        _request: Bson,
    ) -> Box<dyn StreamReader> {
        Box::new(self.open(tag, context, "server-stream", endpoint))
    }

    fn start_client_stream(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
    ) -> Box<dyn StreamWriter> {
        Box::new(self.open(tag, context, "client-stream", endpoint))
    }

    fn start_bidi_stream(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
    ) -> Box<dyn StreamReaderWriter> {
        Box::new(self.open(tag, context, "bidi-stream", endpoint))
    }

    fn start_subscribe(
        &self,
        tag: Tag,
        context: &CallContext,
        endpoint: &str,
        _request: Bson,
    ) -> Box<dyn StreamReader> {
        Box::new(self.open(tag, context, "subscribe", endpoint))
    }
}

struct ScriptedCall {
    tag: Tag,
    script: Arc<Mutex<Script>>,
}

impl ScriptedCall {
    fn record(&self, tag: Tag, issued: Issued) {
        assert_eq!(tag, self.tag, "operation issued with a foreign tag");
        self.script.lock().unwrap().journal.push((tag, issued));
    }
}

impl Responder for ScriptedCall {
    fn finish(&mut self, tag: Tag) {
        self.record(tag, Issued::Finish)
    }

    fn status(&mut self) -> Status {
        self.script
            .lock()
            .unwrap()
            .statuses
            .remove(&self.tag)
            .unwrap_or_default()
    }

    fn take_reply(&mut self) -> Option<Bson> {
        self.script.lock().unwrap().replies.remove(&self.tag)
    }
}

impl StreamReader for ScriptedCall {
    fn read(&mut self, tag: Tag) {
        self.record(tag, Issued::Read)
    }
}

impl StreamWriter for ScriptedCall {
    fn write(&mut self, tag: Tag, message: Bson) {
        self.record(tag, Issued::Write(message))
    }

    fn writes_done(&mut self, tag: Tag) {
        self.record(tag, Issued::WritesDone)
    }
}
