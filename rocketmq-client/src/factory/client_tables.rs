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


//! Shared routing tables of a client instance.
//!
//! The tables are plain concurrent maps owned by whoever builds the client, so several
//! instances can live in one process. Values are reference counted snapshots that are
//! replaced, never edited in place: a reader holding an `Arc` keeps seeing one
//! consistent version while a newer one is installed.

use std::collections::HashMap;
use std::sync::Arc;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use rocketmq_common::common::message::message_queue::MessageQueue;
use rocketmq_remoting::protocol::route::topic_route_data::TopicRouteData;

use crate::producer::producer_impl::topic_publish_info::TopicPublishInfo;

pub type TopicName = CheetahString;
pub type BrokerName = CheetahString;
pub type BrokerAddr = CheetahString;

/// Everything derived from one route fetch of a topic.
///
/// Route data, publish info and subscribe info always come from the same
/// [`TopicRouteData`].
#[derive(Debug)]
pub struct TopicRouteSnapshot {
    pub route_data: TopicRouteData,
    pub publish_info: Arc<TopicPublishInfo>,
    pub subscribe_info: Arc<Vec<MessageQueue>>,
}

/// Topic name to its latest route snapshot.
pub type TopicRouteTable = Arc<DashMap<TopicName, Arc<TopicRouteSnapshot>>>;

/// Broker name to broker id to address. Broker id 0 is the master.
pub type BrokerAddrTable = Arc<DashMap<BrokerName, Arc<HashMap<u64, BrokerAddr>>>>;

#[derive(Clone, Default)]
pub struct ClientTables {
    pub topic_route_table: TopicRouteTable,
    pub broker_addr_table: BrokerAddrTable,
}

impl ClientTables {
    pub fn new() -> Self {
        Self::default()
    }
}
