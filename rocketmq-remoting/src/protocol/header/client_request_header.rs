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

/// Header of `GetRouteinfoByTopic`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GetRouteInfoRequestHeader {
    pub topic: CheetahString,

    #[serde(rename = "acceptStandardJsonOnly")]
    pub accept_standard_json_only: Option<bool>,
}

impl GetRouteInfoRequestHeader {
    const ACCEPT_STANDARD_JSON_ONLY: &'static str = "acceptStandardJsonOnly";
    const TOPIC: &'static str = "topic";

    pub fn new(topic: impl Into<CheetahString>) -> Self {
        GetRouteInfoRequestHeader {
            topic: topic.into(),
            accept_standard_json_only: None,
        }
    }
}

impl FromMap for GetRouteInfoRequestHeader {
    type Error = RocketMQError;

    type Target = GetRouteInfoRequestHeader;

    fn from(map: &HashMap<CheetahString, CheetahString>) -> Result<Self::Target, Self::Error> {
        Ok(GetRouteInfoRequestHeader {
            topic: required_field(map, Self::TOPIC)?,
            accept_standard_json_only: map
                .get(Self::ACCEPT_STANDARD_JSON_ONLY)
                .and_then(|s| s.as_str().parse::<bool>().ok()),
        })
    }
}

impl CommandCustomHeader for GetRouteInfoRequestHeader {
    fn to_map(&self) -> Option<HashMap<CheetahString, CheetahString>> {
        let mut map = HashMap::with_capacity(2);
        map.insert(CheetahString::from_static_str(Self::TOPIC), self.topic.clone());
        let accept = self.accept_standard_json_only.unwrap_or(false);
        map.insert(
            CheetahString::from_static_str(Self::ACCEPT_STANDARD_JSON_ONLY),
            CheetahString::from_static_str(if accept { "true" } else { "false" }),
        );
        Some(map)
    }
}
