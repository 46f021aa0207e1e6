use std::sync::Arc;

use bson::Bson;
use futures::{executor::block_on, StreamExt};
use krossbar_rpc_client::{
    context::CallContext,
    handles::{ReplyStream, UnaryCall},
    status::Status,
    subscriber::Subscriber,
    tag::{Op, Tag},
};
use proptest::prelude::*;

mod implementations;

use implementations::{
    recording_subscriber::RecordingSubscriber,
    scripted_transport::{Issued, ScriptedTransport},
    setup,
};

const MAX_READS: usize = 4;

#[derive(Debug, Clone)]
enum Shape {
    Unary,
    ServerStream,
    ClientStream(usize),
    BidiStream(usize),
    Subscribe,
}

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Unary),
        Just(Shape::ServerStream),
        (0usize..4).prop_map(Shape::ClientStream),
        (0usize..4).prop_map(Shape::BidiStream),
        Just(Shape::Subscribe),
    ]
}

fn payload(len: usize) -> Vec<String> {
    (0..len).map(|i| format!("m{i}")).collect()
}

enum Handle {
    Single(UnaryCall<String>),
    Stream(ReplyStream<String>),
    Subscription,
}

/// Operations a call has issued, but which haven't completed yet
struct Pending {
    tag: Tag,
    shape: Shape,
    handle: Handle,
    outstanding: Vec<Op>,
    seen: usize,
    reads: usize,
}

impl Pending {
    fn scan(&mut self, transport: &ScriptedTransport) {
        let journal = transport.journal(self.tag);

        for issued in &journal[self.seen..] {
            match issued {
                Issued::Start(_) => {}
                Issued::Read => self.outstanding.push(Op::Read),
                Issued::Write(_) => self.outstanding.push(Op::Write),
                Issued::WritesDone => self.outstanding.push(Op::WritesDone),
                Issued::Finish => self.outstanding.push(Op::Finish),
            }
        }

        self.seen = journal.len();
    }
}

proptest! {
    /// Drive random calls with random completion order and outcomes until all of them
    /// are over
    #[test]
    fn calls_always_finish(
        shapes in proptest::collection::vec(shape(), 1..8),
        choices in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let (client, mut dispatcher, transport) = setup();

        let recorder = Arc::new(RecordingSubscriber::default());
        let subscriber: Arc<dyn Subscriber> = recorder.clone();
        block_on(client.set_subscriber(&subscriber));

        let mut calls = Vec::new();
        for shape in shapes.iter().cloned() {
            let context = CallContext::new();
            let (tag, handle) = block_on(async {
                match &shape {
                    Shape::Unary => {
                        let call = client.unary::<u32, String>("unary", &1, context).await.unwrap();
                        (call.tag(), Handle::Single(call))
                    }
                    Shape::ServerStream => {
                        let stream = client.server_stream::<u32, String>("server", &1, context).await.unwrap();
                        (stream.tag(), Handle::Stream(stream))
                    }
                    Shape::ClientStream(len) => {
                        let call = client.client_stream::<String, String>("client", &payload(*len), context).await.unwrap();
                        (call.tag(), Handle::Single(call))
                    }
                    Shape::BidiStream(len) => {
                        let stream = client.bidi_stream::<String, String>("bidi", &payload(*len), context).await.unwrap();
                        (stream.tag(), Handle::Stream(stream))
                    }
                    Shape::Subscribe => {
                        let subscription = client.subscribe("subscribe", &1, context).await.unwrap();
                        (subscription.tag(), Handle::Subscription)
                    }
                }
            });

            let mut pending = Pending { tag, shape, handle, outstanding: Vec::new(), seen: 0, reads: 0 };
            pending.scan(&transport);
            calls.push(pending);
        }

        let mut choices = choices.into_iter().chain(std::iter::repeat(1));
        let mut next = move || choices.next().unwrap_or(1) as usize;

        loop {
            let live: Vec<usize> = (0..calls.len())
                .filter(|i| !calls[*i].outstanding.is_empty())
                .collect();
            if live.is_empty() {
                break;
            }

            let call = &mut calls[live[next() % live.len()]];
            let op = call.outstanding.remove(next() % call.outstanding.len());
            let roll = next();

            match op {
                Op::Read if call.reads < MAX_READS && roll % 3 != 0 => {
                    call.reads += 1;
                    transport.reply(call.tag, format!("r{}", call.reads));
                }
                Op::Read => transport.end_stream(call.tag),
                Op::Write => transport.complete_write(call.tag, roll % 4 != 0),
                Op::WritesDone => transport.complete_writes_done(call.tag),
                Op::Finish => transport.finish(call.tag, Status::ok(), Some(Bson::String("done".into()))),
            }

            prop_assert!(block_on(dispatcher.process_next()));
            call.scan(&transport);
        }

        let stats = block_on(client.stats());
        prop_assert_eq!(stats.started, shapes.len() as u64);
        prop_assert_eq!(stats.finished, shapes.len() as u64);
        prop_assert_eq!(stats.active, 0);
        prop_assert_eq!(stats.protocol_violations, 0);
        prop_assert_eq!(stats.stale_completions, 0);

        let mut pushed = 0;
        let mut subscribed_reads = 0;
        for call in calls {
            let journal = transport.journal(call.tag);

            // Finish is requested exactly once, and is the last operation
            prop_assert_eq!(journal.iter().filter(|issued| **issued == Issued::Finish).count(), 1);
            prop_assert_eq!(journal.last(), Some(&Issued::Finish));

            match &call.shape {
                Shape::ClientStream(len) | Shape::BidiStream(len) => {
                    let written: Vec<Bson> = journal
                        .iter()
                        .filter_map(|issued| match issued {
                            Issued::Write(message) => Some(message.clone()),
                            _ => None,
                        })
                        .collect();
                    let expected: Vec<Bson> = payload(*len).into_iter().map(Bson::String).collect();

                    // The cursor never skips or overruns
                    prop_assert!(written.len() <= *len);
                    prop_assert_eq!(&written[..], &expected[..written.len()]);

                    let writes_done: Vec<usize> = journal
                        .iter()
                        .enumerate()
                        .filter(|(_, issued)| **issued == Issued::WritesDone)
                        .map(|(i, _)| i)
                        .collect();
                    prop_assert!(writes_done.len() <= 1);

                    if let Some(position) = writes_done.first() {
                        prop_assert_eq!(written.len(), *len);
                        prop_assert!(!journal[*position..].iter().any(|issued| matches!(issued, Issued::Write(_))));
                    }
                }
                Shape::ServerStream | Shape::Subscribe => {
                    // A failed read goes straight to finish
                    let reads = journal.iter().filter(|issued| **issued == Issued::Read).count();
                    prop_assert_eq!(reads, call.reads + 1);
                }
                Shape::Unary => {}
            }

            match call.handle {
                Handle::Single(handle) => {
                    prop_assert_eq!(block_on(handle).unwrap(), "done");
                }
                Handle::Stream(stream) => {
                    let replies: Vec<String> = block_on(stream.map(|reply| reply.unwrap()).collect());
                    prop_assert_eq!(replies.len(), call.reads);
                }
                Handle::Subscription => subscribed_reads += call.reads,
            }

            // Destroyed calls never receive completions again
            transport.push(call.tag, Op::Read, true);
            prop_assert!(block_on(dispatcher.process_next()));
            pushed += 1;
        }

        // Every successful subscription read is forwarded
        prop_assert_eq!(recorder.replies().len(), subscribed_reads);

        let stats = block_on(client.stats());
        prop_assert_eq!(stats.stale_completions, pushed);
        prop_assert_eq!(stats.finished, shapes.len() as u64);
    }
}
