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

use crate::protocol::command_custom_header::required_field;
use crate::protocol::command_custom_header::CommandCustomHeader;
use crate::protocol::command_custom_header::FromMap;

/// Sent by a broker when the consumer set of a group changes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConsumerIdsChangedRequestHeader {
    pub consumer_group: CheetahString,
}

impl NotifyConsumerIdsChangedRequestHeader {
    pub const CONSUMER_GROUP: &'static str = "consumerGroup";
}

impl CommandCustomHeader for NotifyConsumerIdsChangedRequestHeader {
    fn to_map(&self) -> Option<HashMap<CheetahString, CheetahString>> {
        let mut map = HashMap::with_capacity(1);
        map.insert(
            CheetahString::from_static_str(Self::CONSUMER_GROUP),
            self.consumer_group.clone(),
        );
        Some(map)
    }
}

impl FromMap for NotifyConsumerIdsChangedRequestHeader {
    type Error = RocketMQError;

    type Target = Self;

    fn from(map: &HashMap<CheetahString, CheetahString>) -> Result<Self::Target, Self::Error> {
        Ok(NotifyConsumerIdsChangedRequestHeader {
            consumer_group: required_field(map, Self::CONSUMER_GROUP)?,
        })
    }
}
