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

use cheetah_string::CheetahString;
use rocketmq_error::RocketMQError;
use serde::Deserialize;
use serde::Serialize;

use crate::protocol::command_custom_header::parse_field;
use crate::protocol::command_custom_header::required_field;
use crate::protocol::command_custom_header::CommandCustomHeader;
use crate::protocol::command_custom_header::FromMap;

/// Header of `SearchOffsetByTimestamp`; `timestamp` is in epoch milliseconds.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchOffsetRequestHeader {
    pub topic: CheetahString,

    pub queue_id: i32,

    pub timestamp: i64,
}

impl SearchOffsetRequestHeader {
    pub const TOPIC: &'static str = "topic";
    pub const QUEUE_ID: &'static str = "queueId";
    pub const TIMESTAMP: &'static str = "timestamp";

    pub fn new(topic: impl Into<CheetahString>, queue_id: i32, timestamp: i64) -> Self {
        SearchOffsetRequestHeader {
            topic: topic.into(),
            queue_id,
            timestamp,
        }
    }
}

impl CommandCustomHeader for SearchOffsetRequestHeader {
    fn to_map(&self) -> Option<HashMap<CheetahString, CheetahString>> {
        let mut map = HashMap::with_capacity(3);
        map.insert(CheetahString::from_static_str(Self::TOPIC), self.topic.clone());
        map.insert(
            CheetahString::from_static_str(Self::QUEUE_ID),
            CheetahString::from_string(self.queue_id.to_string()),
        );
        map.insert(
            CheetahString::from_static_str(Self::TIMESTAMP),
            CheetahString::from_string(self.timestamp.to_string()),
        );
        Some(map)
    }
}

impl FromMap for SearchOffsetRequestHeader {
    type Error = RocketMQError;

    type Target = Self;

    fn from(map: &HashMap<CheetahString, CheetahString>) -> Result<Self::Target, Self::Error> {
        Ok(SearchOffsetRequestHeader {
            topic: required_field(map, Self::TOPIC)?,
            queue_id: parse_field(map, Self::QUEUE_ID)?,
            timestamp: parse_field(map, Self::TIMESTAMP)?,
        })
    }
}
