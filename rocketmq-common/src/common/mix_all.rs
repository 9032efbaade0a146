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


pub const NAMESRV_ADDR_ENV: &str = "NAMESRV_ADDR";
pub const NAMESRV_ADDR_PROPERTY: &str = "rocketmq.namesrv.addr";
pub const DEFAULT_INSTANCE_NAME: &str = "DEFAULT";

/// Role id of a master broker in a broker address map; every other id is a slave.
pub const MASTER_ID: u64 = 0;

/// Topic whose route is used when a topic is unknown to the name server.
pub const AUTO_CREATE_TOPIC_KEY_TOPIC: &str = "TBW102";
pub const DEFAULT_TOPIC_QUEUE_NUMS: i32 = 4;

#[inline]
pub fn is_master(broker_id: u64) -> bool {
    broker_id == MASTER_ID
}
