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


use std::fmt::Display;

use cheetah_string::CheetahString;
use rocketmq_common::common::mix_all;

/// An address found for a broker name, and whether it belongs to a slave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindBrokerResult {
    pub broker_addr: CheetahString,
    pub slave: bool,
    pub broker_id: u64,
}

impl FindBrokerResult {
    pub fn new(broker_addr: CheetahString, broker_id: u64) -> Self {
        FindBrokerResult {
            broker_addr,
            slave: !mix_all::is_master(broker_id),
            broker_id,
        }
    }
}

impl Display for FindBrokerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FindBrokerResult [broker_addr={}, slave={}, broker_id={}]",
            self.broker_addr, self.slave, self.broker_id
        )
    }
}
