//! Tutor requests that run in the background while the learner keeps going
//!
//! Each request is spawned on a tokio runtime with the [`ContentTicket`] of
//! the card it was made for. Finished results come back over a channel and
//! are handed to the trainer by [`ContentQueue::apply_finished`], which drops
//! anything whose card is no longer on screen.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::catalog::ExampleSentence;
use crate::review::ContentTicket;
use crate::trainer::Trainer;
use crate::tutor::{example_or_fallback, explain_or_fallback, Tutor};

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Explanation(String),
    Example(ExampleSentence),
}

struct Finished {
    ticket: ContentTicket,
    content: Content,
}

pub struct ContentQueue<T> {
    tutor: Arc<T>,
    runtime: Handle,
    sender: UnboundedSender<Finished>,
    receiver: UnboundedReceiver<Finished>,
    in_flight: usize,
}

impl<T> ContentQueue<T>
where
    T: Tutor + Send + Sync + 'static,
{
    pub fn new(tutor: T, runtime: Handle) -> Self {
        let (sender, receiver) = unbounded_channel();
        Self {
            tutor: Arc::new(tutor),
            runtime,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn tutor(&self) -> &T {
        &self.tutor
    }

    /// Requests that have not been collected by `apply_finished` yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn request_explanation(&mut self, ticket: ContentTicket) {
        let tutor = Arc::clone(&self.tutor);
        let sender = self.sender.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let text = explain_or_fallback(tutor.as_ref(), ticket.word()).await;
            let _ = sender.send(Finished {
                ticket,
                content: Content::Explanation(text),
            });
        });
    }

    pub fn request_example(&mut self, ticket: ContentTicket) {
        let tutor = Arc::clone(&self.tutor);
        let sender = self.sender.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let example = example_or_fallback(tutor.as_ref(), ticket.word()).await;
            let _ = sender.send(Finished {
                ticket,
                content: Content::Example(example),
            });
        });
    }

    /// Apply every result that has arrived; returns those that reached the
    /// card on screen. Never waits for outstanding requests.
    pub fn apply_finished(&mut self, trainer: &mut Trainer) -> Vec<Content> {
        let mut applied = Vec::new();
        while let Ok(Finished { ticket, content }) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            let shown = match &content {
                Content::Explanation(text) => trainer.apply_explanation(&ticket, text.clone()),
                Content::Example(example) => trainer.apply_example(&ticket, example.clone()),
            };
            if shown {
                applied.push(content);
            } else {
                debug!(word = %ticket.word().id, "late tutor result dropped");
            }
        }
        applied
    }
}
