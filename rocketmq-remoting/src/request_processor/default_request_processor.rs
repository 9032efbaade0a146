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
use tracing::warn;

use crate::code::response_code::RemotingSysResponseCode;
use crate::protocol::remoting_command::RemotingCommand;
use crate::runtime::processor::RequestProcessor;

/// Answers every request with `RequestCodeNotSupported`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRemotingRequestProcessor;

impl RequestProcessor for DefaultRemotingRequestProcessor {
    async fn process_request(
        &self,
        remote_addr: &CheetahString,
        request: RemotingCommand,
    ) -> RocketMQResult<Option<RemotingCommand>> {
        warn!("Request code {} from {} is not supported", request.code(), remote_addr);
        Ok(Some(RemotingCommand::create_response_command_with_code_remark(
            RemotingSysResponseCode::RequestCodeNotSupported,
            format!("request type {} not supported", request.code()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_with_request_code_not_supported() {
        let processor = DefaultRemotingRequestProcessor;
        let response = processor
            .process_request(
                &CheetahString::from_static_str("127.0.0.1:10911"),
                RemotingCommand::create_remoting_command(999),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.code(), 3);
        assert!(response.is_response_type());
        assert!(response.remark().unwrap().as_str().contains("999"));
    }
}
