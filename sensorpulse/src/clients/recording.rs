use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::error::Result;
use crate::{Message, Publish};

/// Keeps every published message in memory. Used for dry runs and tests.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    pub fn messages_on(&self, topic: &str) -> Vec<Message> {
        self.lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Publish for RecordingPublisher {
    fn publish(&self, message: Message) -> impl Future<Output = Result<()>> + Send {
        info!(
            topic = %message.topic,
            payload = %message.payload,
            qos = u8::from(message.qos),
            retain = message.retain,
            "publish"
        );
        self.lock().push(message);
        std::future::ready(Ok(()))
    }
}
