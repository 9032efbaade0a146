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

use crate::codec::remoting_command_codec::DEFAULT_MAX_FRAME_LENGTH;

/// Transport settings of [`RocketmqDefaultClient`](crate::clients::rocketmq_tokio_client::RocketmqDefaultClient).
#[derive(Debug, Clone)]
pub struct TokioClientConfig {
    /// Upper bound of one TCP connect attempt.
    pub connect_timeout_millis: u64,
    /// Frames longer than this are a protocol violation and close the connection.
    pub max_frame_length: usize,
    /// Initial read buffer of each connection.
    pub read_buffer_capacity: usize,
    /// Commands queued for a connection's writer before senders wait.
    pub write_queue_capacity: usize,
}

impl Default for TokioClientConfig {
    fn default() -> Self {
        TokioClientConfig {
            connect_timeout_millis: 3000,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            read_buffer_capacity: 64 * 1024,
            write_queue_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let default_config = TokioClientConfig::default();
        assert_eq!(default_config.connect_timeout_millis, 3000);
        assert_eq!(default_config.max_frame_length, 16 * 1024 * 1024);
        assert!(default_config.write_queue_capacity > 0);
    }
}
