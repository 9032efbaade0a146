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

use bytes::Bytes;
use cheetah_string::CheetahString;
use rocketmq_common::common::message::message_queue::MessageQueue;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::clients::RocketmqDefaultClient;
use rocketmq_remoting::code::request_code::RequestCode;
use rocketmq_remoting::code::response_code::ResponseCode;
use rocketmq_remoting::protocol::header::client_request_header::GetRouteInfoRequestHeader;
use rocketmq_remoting::protocol::header::get_max_offset_request_header::GetMaxOffsetRequestHeader;
use rocketmq_remoting::protocol::header::query_offset_response_header::QueryOffsetResponseHeader;
use rocketmq_remoting::protocol::header::search_offset_request_header::SearchOffsetRequestHeader;
use rocketmq_remoting::protocol::remoting_command::RemotingCommand;
use rocketmq_remoting::protocol::route::topic_route_data::TopicRouteData;
use rocketmq_remoting::runtime::config::client_config::TokioClientConfig;
use tracing::warn;

use crate::factory::topic_route_manager::TopicRouteFetcher;
use crate::implementation::client_remoting_processor::ClientRemotingProcessor;

/// Typed requests to name servers and brokers on top of the remoting client.
pub struct MQClientAPIImpl {
    remoting_client: Arc<RocketmqDefaultClient<ClientRemotingProcessor>>,
}

impl MQClientAPIImpl {
    pub fn new(tokio_client_config: Arc<TokioClientConfig>, client_remoting_processor: ClientRemotingProcessor) -> Self {
        MQClientAPIImpl {
            remoting_client: Arc::new(RocketmqDefaultClient::new(
                tokio_client_config,
                client_remoting_processor,
            )),
        }
    }

    pub fn remoting_client(&self) -> &Arc<RocketmqDefaultClient<ClientRemotingProcessor>> {
        &self.remoting_client
    }

    pub fn update_name_server_address_list(&self, addrs: Vec<CheetahString>) {
        self.remoting_client.update_name_server_address_list(addrs);
    }

    pub fn get_name_server_address_list(&self) -> Vec<CheetahString> {
        self.remoting_client.get_name_server_address_list()
    }

    /// Asks a name server for the route of `topic`.
    ///
    /// `Ok(None)` means the name server does not know the topic.
    pub async fn get_topic_route_info_from_name_server(
        &self,
        topic: &CheetahString,
        timeout_millis: u64,
    ) -> RocketMQResult<Option<TopicRouteData>> {
        let request = RemotingCommand::create_request_command(
            RequestCode::GetRouteinfoByTopic,
            GetRouteInfoRequestHeader::new(topic.clone()),
        );
        let mut response = self.remoting_client.invoke_sync(None, request, timeout_millis).await?;
        match ResponseCode::from(response.code()) {
            ResponseCode::Success => match response.take_body() {
                Some(body) => TopicRouteData::decode(body.as_ref()).map(Some),
                None => Err(RocketMQError::decode_failed("json", "route response without body")),
            },
            ResponseCode::TopicNotExist => {
                warn!("get Topic [{}] RouteInfoFromNameServer is not exist value", topic);
                Ok(None)
            }
            _ => Err(remote_error(&response)),
        }
    }

    pub async fn send_heartbeat(&self, addr: &CheetahString, body: Bytes, timeout_millis: u64) -> RocketMQResult<()> {
        let request = RemotingCommand::create_remoting_command(RequestCode::HeartBeat).set_body(body);
        let response = self
            .remoting_client
            .invoke_sync(Some(addr), request, timeout_millis)
            .await?;
        if ResponseCode::from(response.code()) == ResponseCode::Success {
            Ok(())
        } else {
            Err(remote_error(&response))
        }
    }

    pub async fn get_max_offset(
        &self,
        addr: &CheetahString,
        message_queue: &MessageQueue,
        timeout_millis: u64,
    ) -> RocketMQResult<i64> {
        let request_header = GetMaxOffsetRequestHeader::new(message_queue.get_topic().clone(), message_queue.get_queue_id());
        let request = RemotingCommand::create_request_command(RequestCode::GetMaxOffset, request_header);
        let response = self
            .remoting_client
            .invoke_sync(Some(addr), request, timeout_millis)
            .await?;
        read_offset(&response)
    }

    pub async fn search_offset(
        &self,
        addr: &CheetahString,
        message_queue: &MessageQueue,
        timestamp: i64,
        timeout_millis: u64,
    ) -> RocketMQResult<i64> {
        let request_header = SearchOffsetRequestHeader::new(
            message_queue.get_topic().clone(),
            message_queue.get_queue_id(),
            timestamp,
        );
        let request = RemotingCommand::create_request_command(RequestCode::SearchOffsetByTimestamp, request_header);
        let response = self
            .remoting_client
            .invoke_sync(Some(addr), request, timeout_millis)
            .await?;
        read_offset(&response)
    }

    pub fn scan_response_table(&self) -> usize {
        self.remoting_client.scan_response_table()
    }

    pub fn shutdown(&self) {
        self.remoting_client.shutdown();
    }
}

impl TopicRouteFetcher for MQClientAPIImpl {
    async fn fetch_topic_route(
        &self,
        topic: &CheetahString,
        timeout_millis: u64,
    ) -> RocketMQResult<Option<TopicRouteData>> {
        self.get_topic_route_info_from_name_server(topic, timeout_millis).await
    }
}

fn read_offset(response: &RemotingCommand) -> RocketMQResult<i64> {
    if ResponseCode::from(response.code()) != ResponseCode::Success {
        return Err(remote_error(response));
    }
    let response_header = response.decode_command_custom_header::<QueryOffsetResponseHeader>()?;
    Ok(response_header.offset)
}

fn remote_error(response: &RemotingCommand) -> RocketMQError {
    RocketMQError::remote(
        response.code(),
        response.remark().map(|remark| remark.as_str()).unwrap_or_default(),
    )
}
