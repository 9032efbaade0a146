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

use std::time::Duration;

use cheetah_string::CheetahString;
use rocketmq_error::RocketMQResult;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::connection::ConnectionId;
use crate::protocol::remoting_command::RemotingCommand;

/// A request that has been written and is waiting for its response.
pub struct ResponseFuture {
    pub(crate) opaque: i32,
    pub(crate) addr: CheetahString,
    pub(crate) connection_id: ConnectionId,
    pub(crate) timeout_millis: u64,
    pub(crate) begin_timestamp: Instant,
    tx: oneshot::Sender<RocketMQResult<RemotingCommand>>,
}

impl ResponseFuture {
    pub fn new(
        opaque: i32,
        addr: CheetahString,
        connection_id: ConnectionId,
        timeout_millis: u64,
        tx: oneshot::Sender<RocketMQResult<RemotingCommand>>,
    ) -> Self {
        Self {
            opaque,
            addr,
            connection_id,
            timeout_millis,
            begin_timestamp: Instant::now(),
            tx,
        }
    }

    pub fn opaque(&self) -> i32 {
        self.opaque
    }

    pub fn addr(&self) -> &CheetahString {
        &self.addr
    }

    pub fn timeout_millis(&self) -> u64 {
        self.timeout_millis
    }

    pub fn deadline(&self) -> Instant {
        self.begin_timestamp + Duration::from_millis(self.timeout_millis)
    }

    pub fn is_timeout(&self, now: Instant) -> bool {
        now >= self.deadline()
    }

    /// Delivers the outcome. Returns `false` if the waiting side already gave up.
    pub fn put_response(self, result: RocketMQResult<RemotingCommand>) -> bool {
        self.tx.send(result).is_ok()
    }
}

impl std::fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("opaque", &self.opaque)
            .field("addr", &self.addr)
            .field("connection_id", &self.connection_id)
            .field("timeout_millis", &self.timeout_millis)
            .finish()
    }
}
