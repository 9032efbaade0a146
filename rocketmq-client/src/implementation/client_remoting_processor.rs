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

use cheetah_string::CheetahString;
use parking_lot::RwLock;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::code::request_code::RequestCode;
use rocketmq_remoting::code::response_code::ResponseCode;
use rocketmq_remoting::protocol::header::notify_consumer_ids_changed_request_header::NotifyConsumerIdsChangedRequestHeader;
use rocketmq_remoting::protocol::remoting_command::RemotingCommand;
use rocketmq_remoting::runtime::processor::RequestProcessor;
use tracing::info;
use tracing::warn;

/// Called with the consumer group whose membership changed.
pub type RebalanceHook = Arc<dyn Fn(&CheetahString) + Send + Sync>;

/// Handles requests brokers push to this client.
#[derive(Clone, Default)]
pub struct ClientRemotingProcessor {
    rebalance_hook: Arc<RwLock<Option<RebalanceHook>>>,
}

impl ClientRemotingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rebalance_hook(&self, hook: RebalanceHook) {
        *self.rebalance_hook.write() = Some(hook);
    }

    fn notify_consumer_ids_changed(
        &self,
        remote_addr: &CheetahString,
        request: &RemotingCommand,
    ) -> RocketMQResult<Option<RemotingCommand>> {
        let request_header = request.decode_command_custom_header::<NotifyConsumerIdsChangedRequestHeader>()?;
        info!(
            "receive broker's notification[{}], the consumer group: {} changed, rebalance immediately",
            remote_addr, request_header.consumer_group
        );
        let hook = self.rebalance_hook.read().clone();
        if let Some(hook) = hook {
            hook(&request_header.consumer_group);
        }
        Ok(None)
    }
}

impl RequestProcessor for ClientRemotingProcessor {
    async fn process_request(
        &self,
        remote_addr: &CheetahString,
        request: RemotingCommand,
    ) -> RocketMQResult<Option<RemotingCommand>> {
        match RequestCode::from(request.code()) {
            RequestCode::NotifyConsumerIdsChanged => self.notify_consumer_ids_changed(remote_addr, &request),
            _ => {
                warn!("Unsupported request code {} from {}", request.code(), remote_addr);
                Ok(Some(RemotingCommand::create_response_command_with_code_remark(
                    ResponseCode::RequestCodeNotSupported,
                    format!("request code {} not supported by client", request.code()),
                )))
            }
        }
    }
}
