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

use rocketmq_error::RocketMQResult;

use crate::protocol::remoting_command::RemotingCommand;

/// Completion handler of an asynchronous invocation.
///
/// Called exactly once with the response or with the timeout or connection error
/// that ended the call.
pub trait InvokeCallback: Send + 'static {
    fn operation_complete(self, result: RocketMQResult<RemotingCommand>);
}

impl<F> InvokeCallback for F
where
    F: FnOnce(RocketMQResult<RemotingCommand>) + Send + 'static,
{
    fn operation_complete(self, result: RocketMQResult<RemotingCommand>) {
        self(result)
    }
}
