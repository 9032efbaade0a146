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

use dashmap::DashMap;
use rocketmq_error::RocketMQError;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::base::response_future::ResponseFuture;
use crate::connection::ConnectionId;
use crate::protocol::remoting_command::RemotingCommand;

/// Pending invocations keyed by opaque.
///
/// Every entry leaves the table exactly once: through the matching response, the
/// waiter's own deadline, the expiry sweep, or the failure of its connection.
/// Whoever removes it delivers the outcome.
#[derive(Debug, Default)]
pub struct ResponseTable {
    futures: DashMap<i32, ResponseFuture>,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self {
            futures: DashMap::with_capacity(256),
        }
    }

    pub fn insert(&self, future: ResponseFuture) {
        self.futures.insert(future.opaque, future);
    }

    pub fn remove(&self, opaque: i32) -> Option<ResponseFuture> {
        self.futures.remove(&opaque).map(|(_, future)| future)
    }

    pub fn contains(&self, opaque: i32) -> bool {
        self.futures.contains_key(&opaque)
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }

    /// Hands a response to the invocation with the same opaque.
    ///
    /// Returns `false` when nothing is waiting for it, in which case the response is dropped.
    pub fn complete(&self, response: RemotingCommand) -> bool {
        let opaque = response.opaque();
        match self.remove(opaque) {
            Some(future) => {
                if !future.put_response(Ok(response)) {
                    debug!("Waiter of opaque {} is gone, response dropped", opaque);
                }
                true
            }
            None => {
                debug!(
                    "Discarding response with no pending invocation: opaque={}, code={}",
                    opaque,
                    response.code()
                );
                false
            }
        }
    }

    /// Fails every invocation whose deadline has passed with a timeout. Returns how many.
    pub fn scan_expired(&self, now: Instant) -> usize {
        let expired: Vec<i32> = self
            .futures
            .iter()
            .filter(|entry| entry.value().is_timeout(now))
            .map(|entry| *entry.key())
            .collect();

        let mut count = 0;
        for opaque in expired {
            if let Some((_, future)) = self.futures.remove_if(&opaque, |_, f| f.is_timeout(now)) {
                warn!(
                    "Remove timeout request, opaque={}, addr={}, timeout={}ms",
                    opaque, future.addr, future.timeout_millis
                );
                let timeout_millis = future.timeout_millis;
                future.put_response(Err(RocketMQError::timeout("invoke", timeout_millis)));
                count += 1;
            }
        }
        count
    }

    /// Fails every invocation sent over `connection_id` with `ConnectionClosed`.
    pub fn fail_connection(&self, connection_id: &ConnectionId) -> usize {
        let affected: Vec<i32> = self
            .futures
            .iter()
            .filter(|entry| &entry.value().connection_id == connection_id)
            .map(|entry| *entry.key())
            .collect();

        let mut count = 0;
        for opaque in affected {
            if let Some((_, future)) = self.futures.remove_if(&opaque, |_, f| &f.connection_id == connection_id) {
                let addr = future.addr.to_string();
                future.put_response(Err(RocketMQError::connection_closed(addr)));
                count += 1;
            }
        }
        count
    }
}
