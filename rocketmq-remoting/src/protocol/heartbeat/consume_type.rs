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

use std::fmt;
use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumeType {
    #[default]
    ConsumeActively,
    ConsumePassively,
    ConsumePop,
}

impl ConsumeType {
    fn get_type_cn(&self) -> &'static str {
        match self {
            ConsumeType::ConsumeActively => "PULL",
            ConsumeType::ConsumePassively => "PUSH",
            ConsumeType::ConsumePop => "POP",
        }
    }
}

impl Display for ConsumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_type_cn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_like_the_broker_expects() {
        assert_eq!(
            serde_json::to_string(&ConsumeType::ConsumePassively).unwrap(),
            "\"CONSUME_PASSIVELY\""
        );
        let pop: ConsumeType = serde_json::from_str("\"CONSUME_POP\"").unwrap();
        assert_eq!(pop, ConsumeType::ConsumePop);
        assert_eq!(ConsumeType::ConsumeActively.to_string(), "PULL");
    }
}
