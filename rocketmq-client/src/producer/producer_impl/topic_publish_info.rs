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


use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use rocketmq_common::common::message::message_queue::MessageQueue;
use rocketmq_remoting::protocol::route::topic_route_data::TopicRouteData;

/// Producer view of a topic: the queues a message may be sent to and a round-robin cursor.
#[derive(Debug, Default)]
pub struct TopicPublishInfo {
    pub order_topic: bool,
    pub have_topic_router_info: bool,
    pub message_queue_list: Vec<MessageQueue>,
    pub send_which_queue: AtomicUsize,
    pub topic_route_data: Option<TopicRouteData>,
}

impl Clone for TopicPublishInfo {
    fn clone(&self) -> Self {
        TopicPublishInfo {
            order_topic: self.order_topic,
            have_topic_router_info: self.have_topic_router_info,
            message_queue_list: self.message_queue_list.clone(),
            send_which_queue: AtomicUsize::new(self.send_which_queue.load(Ordering::Relaxed)),
            topic_route_data: self.topic_route_data.clone(),
        }
    }
}

impl PartialEq for TopicPublishInfo {
    /// The selection cursor is not part of the view.
    fn eq(&self, other: &Self) -> bool {
        self.order_topic == other.order_topic
            && self.have_topic_router_info == other.have_topic_router_info
            && self.message_queue_list == other.message_queue_list
            && self.topic_route_data == other.topic_route_data
    }
}

impl TopicPublishInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Usable for sending: route info applied and at least one queue.
    pub fn ok(&self) -> bool {
        self.have_topic_router_info && !self.message_queue_list.is_empty()
    }

    pub fn reset_index(&self) {
        self.send_which_queue.store(0, Ordering::Relaxed);
    }

    /// Picks the next queue round-robin, skipping queues of `last_broker_name` when
    /// another broker is available.
    pub fn select_one_message_queue(&self, last_broker_name: Option<&str>) -> Option<MessageQueue> {
        if self.message_queue_list.is_empty() {
            return None;
        }
        if let Some(last_broker_name) = last_broker_name {
            for _ in 0..self.message_queue_list.len() {
                let mq = self.next_queue();
                if mq.get_broker_name().as_str() != last_broker_name {
                    return Some(mq.clone());
                }
            }
        }
        Some(self.next_queue().clone())
    }

    fn next_queue(&self) -> &MessageQueue {
        let index = self.send_which_queue.fetch_add(1, Ordering::Relaxed);
        &self.message_queue_list[index % self.message_queue_list.len()]
    }
}
