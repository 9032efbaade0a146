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

use std::collections::HashMap;

use rocketmq_common::utils::serde_json_utils::SerdeJsonUtils;
use rocketmq_error::RocketMQResult;
use serde::Deserialize;
use serde::Serialize;

use crate::protocol::route::route_data_view::BrokerData;
use crate::protocol::route::route_data_view::QueueData;

/// Raw routing facts for one topic, as returned by the name server.
#[derive(Debug, Serialize, Deserialize, Clone, Default, Eq, PartialEq)]
pub struct TopicRouteData {
    #[serde(rename = "orderTopicConf", default)]
    pub order_topic_conf: Option<String>,
    #[serde(rename = "queueDatas", default)]
    pub queue_datas: Vec<QueueData>,
    #[serde(rename = "brokerDatas", default)]
    pub broker_datas: Vec<BrokerData>,
    #[serde(rename = "filterServerTable", default)]
    pub filter_server_table: HashMap<String, Vec<String>>,
}

impl TopicRouteData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a name server response body.
    ///
    /// Name servers may write `brokerAddrs` with bare integer keys (`{0:"host:port"}`),
    /// so keys are normalized before the JSON decode.
    pub fn decode(body: &[u8]) -> RocketMQResult<TopicRouteData> {
        SerdeJsonUtils::from_lenient_json_slice(body)
    }

    pub fn encode(&self) -> RocketMQResult<Vec<u8>> {
        SerdeJsonUtils::to_json_vec(self)
    }

    /// True when `old_data` is absent or describes different queues or brokers.
    /// List order is not significant.
    pub fn topic_route_data_changed(&self, old_data: Option<&TopicRouteData>) -> bool {
        let Some(old_data) = old_data else {
            return true;
        };
        let mut now = self.clone();
        let mut old = old_data.clone();
        now.queue_datas.sort();
        now.broker_datas.sort();
        old.queue_datas.sort();
        old.broker_datas.sort();
        now != old
    }

    /// Returns a copy where each broker exposes `min(max_queue_nums, read_queue_nums)`
    /// queues for both reading and writing.
    pub fn with_clamped_queue_nums(&self, max_queue_nums: u32) -> TopicRouteData {
        let mut clamped = self.clone();
        for queue_data in clamped.queue_datas.iter_mut() {
            let queue_nums = queue_data.read_queue_nums.min(max_queue_nums);
            queue_data.read_queue_nums = queue_nums;
            queue_data.write_queue_nums = queue_nums;
        }
        clamped
    }
}
