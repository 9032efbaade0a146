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

use std::collections::HashSet;

use cheetah_string::CheetahString;
use rocketmq_common::utils::serde_json_utils::SerdeJsonUtils;
use rocketmq_error::RocketMQResult;
use serde::Deserialize;
use serde::Serialize;

use crate::protocol::heartbeat::consumer_data::ConsumerData;
use crate::protocol::heartbeat::producer_data::ProducerData;

/// Body of a `HeartBeat` request: this client's producer and consumer groups.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    #[serde(rename = "clientID")]
    pub client_id: CheetahString,
    #[serde(default)]
    pub producer_data_set: HashSet<ProducerData>,
    #[serde(default)]
    pub consumer_data_set: HashSet<ConsumerData>,
}

impl HeartbeatData {
    pub fn encode(&self) -> RocketMQResult<Vec<u8>> {
        SerdeJsonUtils::to_json_vec(self)
    }

    pub fn decode(body: &[u8]) -> RocketMQResult<HeartbeatData> {
        SerdeJsonUtils::from_json_slice(body)
    }

    pub fn is_empty(&self) -> bool {
        self.producer_data_set.is_empty() && self.consumer_data_set.is_empty()
    }
}
