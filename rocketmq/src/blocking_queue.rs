// Copyright 2023 The RocketMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time;

/// A thread-safe unbounded FIFO blocking queue. To replace Java `LinkedBlockingQueue`.
///
/// Multiple producers and consumers may use the queue concurrently; every item is
/// handed to exactly one consumer. The lock is a `parking_lot::Mutex` that is never
/// held across an await point, so producers can enqueue from synchronous code.
pub struct BlockingQueue<T> {
    /// The underlying queue storing the items.
    queue: Mutex<VecDeque<T>>,
    /// Signalled after every push.
    not_empty: Notify,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        BlockingQueue {
            queue: Mutex::new(VecDeque::new()),
            not_empty: Notify::new(),
        }
    }

    /// Adds an item to the tail. Never waits.
    pub fn put(&self, item: T) {
        self.queue.lock().push_back(item);
        self.not_empty.notify_one();
    }

    /// Removes and returns an item from the queue, waiting until an item is available.
    pub async fn take(&self) -> T {
        loop {
            // Registered before the check so a push between check and await is not lost.
            let notified = self.not_empty.notified();
            if let Some(item) = self.try_poll() {
                return item;
            }
            notified.await;
        }
    }

    /// Attempts to remove and return an item from the queue within a specified timeout.
    ///
    /// # Returns
    ///
    /// `Some(item)` if an item was removed from the queue, `None` if the timeout was reached.
    pub async fn poll(&self, timeout: std::time::Duration) -> Option<T> {
        time::timeout(timeout, self.take()).await.ok()
    }

    /// Removes and returns the head of the queue without waiting.
    pub fn try_poll(&self) -> Option<T> {
        let (item, remaining) = {
            let mut queue = self.queue.lock();
            let item = queue.pop_front();
            (item, queue.len())
        };
        if item.is_some() && remaining > 0 {
            // Pass the wakeup on; Notify keeps at most one permit.
            self.not_empty.notify_one();
        }
        item
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
