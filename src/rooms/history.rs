use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::rooms::wire::WireMessage;

/// Rolling window of the most recent room messages, oldest first.
///
/// Capacity is enforced at insertion: the oldest entry is evicted before the
/// new one goes in, so the length never exceeds the capacity handed to
/// [`HistoryBuffer::push`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryBuffer(VecDeque<WireMessage>);

impl HistoryBuffer {
    pub fn push(&mut self, message: WireMessage, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.0.len() >= capacity {
            self.0.pop_front();
        }
        self.0.push_back(message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &WireMessage> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
