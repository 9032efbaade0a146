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
use std::hash::Hash;
use std::hash::Hasher;

use cheetah_string::CheetahString;
use rocketmq_common::TimeUtils::get_current_millis;
use serde::Deserialize;
use serde::Serialize;

/// One topic subscription of a consumer group, as reported in heartbeats.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    #[serde(default)]
    pub class_filter_mode: bool,
    pub topic: CheetahString,
    pub sub_string: CheetahString,
    #[serde(default)]
    pub tags_set: HashSet<CheetahString>,
    #[serde(default)]
    pub code_set: HashSet<i32>,
    pub sub_version: i64,
    #[serde(default = "SubscriptionData::default_expression_type")]
    pub expression_type: CheetahString,
}

impl Default for SubscriptionData {
    fn default() -> Self {
        SubscriptionData {
            class_filter_mode: false,
            topic: CheetahString::new(),
            sub_string: CheetahString::new(),
            tags_set: HashSet::new(),
            code_set: HashSet::new(),
            sub_version: get_current_millis() as i64,
            expression_type: Self::default_expression_type(),
        }
    }
}

impl SubscriptionData {
    pub const SUB_ALL: &'static str = "*";
    pub const EXPRESSION_TYPE_TAG: &'static str = "TAG";

    fn default_expression_type() -> CheetahString {
        CheetahString::from_static_str(Self::EXPRESSION_TYPE_TAG)
    }

    /// Builds a tag subscription. `sub_string` is a `||`-separated tag list or `*`.
    ///
    /// Tag hash codes are not filled in; brokers recompute them from `tagsSet`.
    pub fn new(topic: impl Into<CheetahString>, sub_string: impl Into<CheetahString>) -> Self {
        let sub_string = sub_string.into();
        let tags_set = if sub_string.as_str().is_empty() || sub_string.as_str() == Self::SUB_ALL {
            HashSet::new()
        } else {
            sub_string
                .as_str()
                .split("||")
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(|tag| CheetahString::from_string(tag.to_string()))
                .collect()
        };
        let sub_string = if sub_string.as_str().is_empty() {
            CheetahString::from_static_str(Self::SUB_ALL)
        } else {
            sub_string
        };
        SubscriptionData {
            topic: topic.into(),
            sub_string,
            tags_set,
            ..Default::default()
        }
    }
}

impl Hash for SubscriptionData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class_filter_mode.hash(state);
        self.topic.hash(state);
        self.sub_string.hash(state);
        self.sub_version.hash(state);
        self.expression_type.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_splits_tags() {
        let data = SubscriptionData::new("TopicTest", "TagA || TagB");
        assert_eq!(data.tags_set.len(), 2);
        assert!(data.tags_set.contains("TagA"));
        assert!(data.tags_set.contains("TagB"));
    }

    #[test]
    fn wildcard_and_empty_subscribe_everything() {
        assert!(SubscriptionData::new("T", "*").tags_set.is_empty());
        let empty = SubscriptionData::new("T", "");
        assert_eq!(empty.sub_string.as_str(), "*");
    }

    #[test]
    fn json_field_names() {
        let json = serde_json::to_value(SubscriptionData::new("T", "*")).unwrap();
        assert!(json.get("subString").is_some());
        assert!(json.get("tagsSet").is_some());
        assert!(json.get("subVersion").is_some());
        assert_eq!(json.get("expressionType").unwrap(), "TAG");
    }
}
