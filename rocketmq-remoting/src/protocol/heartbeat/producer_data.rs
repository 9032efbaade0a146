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
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProducerData {
    pub group_name: CheetahString,
}

impl ProducerData {
    pub fn new(group_name: impl Into<CheetahString>) -> Self {
        ProducerData {
            group_name: group_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_producer_data() {
        let serialized = serde_json::to_string(&ProducerData::new("group1")).unwrap();
        assert_eq!(serialized, r#"{"groupName":"group1"}"#);
    }
}
