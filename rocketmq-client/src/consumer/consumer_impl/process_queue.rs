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


use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use rocketmq_common::TimeUtils::get_current_millis;

use crate::consumer::consumer_impl::PULL_MAX_IDLE_TIME;

/// Consumption bookkeeping shared by every pull request of one message queue.
///
/// Once a rebalance takes the queue away from this client the process queue is marked
/// dropped, and pull workers discard requests that still refer to it.
#[derive(Debug)]
pub struct ProcessQueue {
    dropped: AtomicBool,
    last_pull_timestamp: AtomicU64,
}

impl Default for ProcessQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessQueue {
    pub fn new() -> Self {
        ProcessQueue {
            dropped: AtomicBool::new(false),
            last_pull_timestamp: AtomicU64::new(get_current_millis()),
        }
    }

    pub fn set_dropped(&self, dropped: bool) {
        self.dropped.store(dropped, Ordering::Release);
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    pub fn last_pull_timestamp(&self) -> u64 {
        self.last_pull_timestamp.load(Ordering::Acquire)
    }

    pub fn set_last_pull_timestamp(&self, timestamp: u64) {
        self.last_pull_timestamp.store(timestamp, Ordering::Release);
    }

    pub fn is_pull_expired(&self) -> bool {
        get_current_millis().saturating_sub(self.last_pull_timestamp()) > *PULL_MAX_IDLE_TIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_process_queue_is_live() {
        let process_queue = ProcessQueue::new();
        assert!(!process_queue.is_dropped());
        assert!(!process_queue.is_pull_expired());
    }

    #[test]
    fn dropped_flag_sticks() {
        let process_queue = ProcessQueue::new();
        process_queue.set_dropped(true);
        assert!(process_queue.is_dropped());
    }

    #[test]
    fn stale_pull_timestamp_expires() {
        let process_queue = ProcessQueue::new();
        process_queue.set_last_pull_timestamp(0);
        assert!(process_queue.is_pull_expired());
    }
}
