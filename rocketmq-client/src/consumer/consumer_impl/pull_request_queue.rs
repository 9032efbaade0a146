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


use std::sync::Arc;
use std::time::Duration;

use rocketmq_rust::RocketMQBlockingQueue;
use tracing::debug;

use crate::consumer::consumer_impl::pull_request::PullRequest;

/// Unbounded FIFO hand-off between whoever decides a queue needs pulling and the
/// pull workers.
///
/// `enqueue` never blocks and never drops. Each request is handed to exactly one
/// worker. Clones share the same queue.
#[derive(Clone, Default)]
pub struct PullRequestQueue {
    queue: Arc<RocketMQBlockingQueue<PullRequest>>,
}

impl PullRequestQueue {
    pub fn new() -> Self {
        PullRequestQueue {
            queue: Arc::new(RocketMQBlockingQueue::new()),
        }
    }

    pub fn enqueue(&self, pull_request: PullRequest) {
        self.queue.put(pull_request);
    }

    /// Enqueues `pull_request` after `delay` on a spawned task.
    pub fn enqueue_later(&self, pull_request: PullRequest, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.enqueue(pull_request);
        });
    }

    /// Waits until a request is available.
    pub async fn dequeue(&self) -> PullRequest {
        self.queue.take().await
    }

    pub fn try_dequeue(&self) -> Option<PullRequest> {
        self.queue.try_poll()
    }

    pub async fn dequeue_timeout(&self, timeout: Duration) -> Option<PullRequest> {
        self.queue.poll(timeout).await
    }

    /// Like [`dequeue`](Self::dequeue) but discards requests whose process queue was dropped.
    pub async fn dequeue_active(&self) -> PullRequest {
        loop {
            let pull_request = self.queue.take().await;
            if !pull_request.is_dropped() {
                return pull_request;
            }
            debug!("discarding {}, its process queue was dropped", pull_request);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
