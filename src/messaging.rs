// src/messaging.rs

//! Broadcast mailbox between modules with one cycle of latency.
//!
//! Messages sent during cycle N become visible to `receive` in cycle N+1.
//! The scheduler swaps the queues exactly once per cycle, before any module
//! runs, so what a module observes does not depend on execution order
//! within the cycle.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

type TopicQueues = HashMap<String, Vec<String>>;

#[derive(Debug, Default)]
pub struct MessageBus {
    send_queue: Mutex<TopicQueues>,
    receive_queue: Mutex<TopicQueues>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message on a topic. It becomes receivable next cycle.
    pub fn send(&self, topic: &str, payload: &str) {
        let mut send = self
            .send_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        send.entry(topic.to_string())
            .or_default()
            .push(payload.to_string());
    }

    /// Messages sent on the topic during the previous cycle.
    pub fn receive(&self, topic: &str) -> Vec<String> {
        let receive = self
            .receive_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        receive.get(topic).cloned().unwrap_or_default()
    }

    /// Promote last cycle's sends to the receive side and start a fresh
    /// send queue. Called by the scheduler once per cycle; anything still
    /// unread from the cycle before is dropped.
    pub fn swap_queues(&self) {
        let mut send = self
            .send_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut receive = self
            .receive_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *receive = std::mem::take(&mut *send);
    }
}
