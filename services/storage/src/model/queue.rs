use std::collections::HashMap;

use cumulo_core::time::DateTime;

/// A message queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Queue {
    /// Queue name.
    pub name: String,
    /// User metadata attached to the queue.
    pub metadata: HashMap<String, String>,
}

/// A message read from a queue.
///
/// `pop_receipt` is only present on messages obtained through a
/// destructive get; peeked messages cannot be deleted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueMessage {
    /// Service-assigned message id.
    pub message_id: String,
    /// Receipt required to delete the message, from a destructive get.
    pub pop_receipt: Option<String>,
    /// Message text, decoded from its wire encoding.
    pub text: String,
    /// When the message was added.
    pub insertion_time: Option<DateTime>,
    /// When the message will be discarded by the service.
    pub expiration_time: Option<DateTime>,
    /// When the message becomes visible to other consumers again.
    pub time_next_visible: Option<DateTime>,
    /// How many times the message has been dequeued.
    pub dequeue_count: u32,
}
