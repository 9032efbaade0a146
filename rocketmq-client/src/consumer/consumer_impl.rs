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


pub mod process_queue;
pub mod pull_request;
pub mod pull_request_queue;

lazy_static::lazy_static! {
    /// Idle time after which a process queue counts as no longer pulled.
    pub(crate) static ref PULL_MAX_IDLE_TIME: u64 = std::env::var("rocketmq.client.pull.pullMaxIdleTime")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(120_000);
}
