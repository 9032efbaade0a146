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

use cheetah_string::CheetahString;
use rocketmq_error::RocketMQResult;

use crate::protocol::remoting_command::RemotingCommand;

/// Handles requests a peer initiates over a client connection.
///
/// The returned command, if any, is sent back as the response; its opaque and
/// response flag are filled in by the caller. Nothing is sent for oneway requests.
#[trait_variant::make(RequestProcessor: Send)]
pub trait LocalRequestProcessor {
    async fn process_request(
        &self,
        remote_addr: &CheetahString,
        request: RemotingCommand,
    ) -> RocketMQResult<Option<RemotingCommand>>;
}
