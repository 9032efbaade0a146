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
use crate::protocol::command_custom_header::CommandCustomHeader;
use crate::protocol::command_custom_header::FromMap;

/// Response header of both `GetMaxOffset` and `SearchOffsetByTimestamp`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QueryOffsetResponseHeader {
    pub offset: i64,
}

impl QueryOffsetResponseHeader {
    pub const OFFSET: &'static str = "offset";
}

impl CommandCustomHeader for QueryOffsetResponseHeader {
    fn to_map(&self) -> Option<HashMap<CheetahString, CheetahString>> {
        let mut map = HashMap::with_capacity(1);
        map.insert(
            CheetahString::from_static_str(Self::OFFSET),
            CheetahString::from_string(self.offset.to_string()),
        );
        Some(map)
    }
}

impl FromMap for QueryOffsetResponseHeader {
    type Error = RocketMQError;

    type Target = Self;

    fn from(map: &HashMap<CheetahString, CheetahString>) -> Result<Self::Target, Self::Error> {
        Ok(QueryOffsetResponseHeader {
            offset: parse_field(map, Self::OFFSET)?,
        })
    }
}
