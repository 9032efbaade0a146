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
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use parking_lot::RwLock;
use rocketmq_common::common::constant::PermName;
use rocketmq_common::common::message::message_queue::MessageQueue;
use rocketmq_common::common::mix_all;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::protocol::route::topic_route_data::TopicRouteData;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::client_config::ClientConfig;
use crate::factory::client_tables::ClientTables;
use crate::factory::client_tables::TopicRouteSnapshot;
use crate::implementation::find_broker_result::FindBrokerResult;
use crate::producer::producer_impl::topic_publish_info::TopicPublishInfo;

const LOCK_TIMEOUT_MILLIS: u64 = 3000;

/// Source of topic route data, normally a name server.
///
/// `Ok(None)` means the topic is unknown.
#[trait_variant::make(TopicRouteFetcher: Send)]
pub trait LocalTopicRouteFetcher {
    async fn fetch_topic_route(
        &self,
        topic: &CheetahString,
        timeout_millis: u64,
    ) -> RocketMQResult<Option<TopicRouteData>>;
}

/// Keeps per-topic routes fresh and derives the producer and consumer views from them.
pub struct TopicRouteManager<F> {
    fetcher: Arc<F>,
    tables: ClientTables,
    default_topic: CheetahString,
    default_topic_queue_nums: u32,
    fetch_timeout_millis: u64,
    /// One lock per topic, held across its fetch and apply.
    topic_locks: DashMap<CheetahString, Arc<tokio::sync::Mutex<()>>>,
    /// Applies share it; the offline broker sweep takes it exclusively.
    sweep_lock: RwLock<()>,
}

impl<F> TopicRouteManager<F>
where
    F: TopicRouteFetcher + Sync + 'static,
{
    pub fn new(fetcher: Arc<F>, tables: ClientTables, client_config: &ClientConfig) -> Self {
        TopicRouteManager {
            fetcher,
            tables,
            default_topic: client_config.default_topic.clone(),
            default_topic_queue_nums: client_config.default_topic_queue_nums,
            fetch_timeout_millis: client_config.mq_client_api_timeout,
            topic_locks: DashMap::new(),
            sweep_lock: RwLock::new(()),
        }
    }

    pub fn tables(&self) -> &ClientTables {
        &self.tables
    }

    /// Returns usable publish info for `topic`, fetching its route first if needed.
    ///
    /// When the topic has no route of its own, the default topic's route is used with
    /// each broker capped at the configured default queue count.
    pub async fn resolve_publish_info(&self, topic: &CheetahString) -> RocketMQResult<Arc<TopicPublishInfo>> {
        if let Some(info) = self.usable_publish_info(topic) {
            return Ok(info);
        }

        if let Err(e) = self.update_route_info(topic).await {
            debug!("route of topic {} not available: {}", topic, e);
        }
        if let Some(info) = self.usable_publish_info(topic) {
            return Ok(info);
        }

        if let Err(e) = self.update_route_info_from_default_topic(topic).await {
            warn!("default topic fallback for {} failed: {}", topic, e);
        }
        self.usable_publish_info(topic)
            .ok_or_else(|| RocketMQError::route_not_found(topic.as_str()))
    }

    /// Fetches the route of `topic` itself and applies it. Returns whether the tables changed.
    pub async fn update_route_info(&self, topic: &CheetahString) -> RocketMQResult<bool> {
        let _guard = self.lock_topic(topic).await?;
        match self.fetcher.fetch_topic_route(topic, self.fetch_timeout_millis).await? {
            Some(route_data) => Ok(self.apply_route_data(topic, route_data)),
            None => Err(RocketMQError::route_not_found(topic.as_str())),
        }
    }

    /// Applies the default topic's route to `topic`, with queue counts capped.
    pub async fn update_route_info_from_default_topic(&self, topic: &CheetahString) -> RocketMQResult<bool> {
        let _guard = self.lock_topic(topic).await?;
        let Some(default_route) = self
            .fetcher
            .fetch_topic_route(&self.default_topic, self.fetch_timeout_millis)
            .await?
        else {
            return Err(RocketMQError::route_not_found(topic.as_str()));
        };
        let route_data = default_route.with_clamped_queue_nums(self.default_topic_queue_nums);
        info!(
            "topic {} has no route, using default topic {} capped at {} queues",
            topic, self.default_topic, self.default_topic_queue_nums
        );
        Ok(self.apply_route_data(topic, route_data))
    }

    /// Installs `route_data` as the route of `topic`.
    ///
    /// Broker address maps named by the route are replaced, then the route, publish
    /// info and subscribe info are swapped in as one snapshot. Unchanged data leaves
    /// the snapshot alone and returns `false`, but broker maps missing from the
    /// address table are put back.
    pub fn apply_route_data(&self, topic: &CheetahString, route_data: TopicRouteData) -> bool {
        let _guard = self.sweep_lock.read();
        let changed = match self.tables.topic_route_table.get(topic) {
            Some(current) => {
                route_data.topic_route_data_changed(Some(&current.route_data)) || !current.publish_info.ok()
            }
            None => true,
        };
        if !changed {
            for broker_data in &route_data.broker_datas {
                if !self.tables.broker_addr_table.contains_key(broker_data.broker_name()) {
                    info!("broker {} of topic {} reinstalled", broker_data.broker_name(), topic);
                    self.tables
                        .broker_addr_table
                        .insert(broker_data.broker_name().clone(), Arc::new(broker_data.broker_addrs().clone()));
                }
            }
            return false;
        }

        for broker_data in &route_data.broker_datas {
            self.tables
                .broker_addr_table
                .insert(broker_data.broker_name().clone(), Arc::new(broker_data.broker_addrs().clone()));
        }
        let publish_info = topic_route_data2topic_publish_info(topic, &route_data);
        let subscribe_info = topic_route_data2topic_subscribe_info(topic, &route_data);
        info!(
            "topicRouteTable.put. Topic = {}, publish queues = {}, subscribe queues = {}",
            topic,
            publish_info.message_queue_list.len(),
            subscribe_info.len()
        );
        self.tables.topic_route_table.insert(
            topic.clone(),
            Arc::new(TopicRouteSnapshot {
                route_data,
                publish_info: Arc::new(publish_info),
                subscribe_info: Arc::new(subscribe_info),
            }),
        );
        true
    }

    /// Refreshes every known topic plus `extra_topics`. Failures are logged per topic.
    pub async fn update_all_topic_route_info(&self, extra_topics: &[CheetahString]) {
        let mut topics: HashSet<CheetahString> = self.topic_list().into_iter().collect();
        topics.extend(extra_topics.iter().cloned());
        for topic in topics {
            if let Err(e) = self.update_route_info(&topic).await {
                warn!("updateTopicRouteInfoFromNameServer of {} failed: {}", topic, e);
            }
        }
        self.clean_offline_broker();
    }

    /// Drops brokers that no cached route mentions any more.
    pub fn clean_offline_broker(&self) {
        let _guard = self.sweep_lock.write();
        let live: HashSet<CheetahString> = self
            .tables
            .topic_route_table
            .iter()
            .flat_map(|entry| {
                entry
                    .route_data
                    .broker_datas
                    .iter()
                    .map(|broker_data| broker_data.broker_name().clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        self.tables.broker_addr_table.retain(|broker_name, _| {
            let keep = live.contains(broker_name);
            if !keep {
                info!("the broker {} is offline, remove it", broker_name);
            }
            keep
        });
    }

    /// Finds an address of `broker_name`.
    ///
    /// `broker_id` is tried first. Unless `only_this_broker` is set any other
    /// address of the broker is accepted, lowest id first.
    pub fn resolve_broker_address(
        &self,
        broker_name: &CheetahString,
        broker_id: u64,
        only_this_broker: bool,
    ) -> Option<FindBrokerResult> {
        let addrs = self
            .tables
            .broker_addr_table
            .get(broker_name)
            .map(|entry| entry.value().clone())?;

        if let Some(addr) = addrs.get(&broker_id).filter(|addr| !addr.is_empty()) {
            return Some(FindBrokerResult::new(addr.clone(), broker_id));
        }
        if only_this_broker {
            return None;
        }
        addrs
            .iter()
            .filter(|(_, addr)| !addr.is_empty())
            .min_by_key(|(id, _)| **id)
            .map(|(id, addr)| FindBrokerResult::new(addr.clone(), *id))
    }

    pub fn master_address(&self, broker_name: &CheetahString) -> Option<CheetahString> {
        self.resolve_broker_address(broker_name, mix_all::MASTER_ID, true)
            .map(|result| result.broker_addr)
    }

    /// Every known master address.
    pub fn master_addresses(&self) -> Vec<(CheetahString, CheetahString)> {
        self.tables
            .broker_addr_table
            .iter()
            .filter_map(|entry| {
                entry
                    .get(&mix_all::MASTER_ID)
                    .filter(|addr| !addr.is_empty())
                    .map(|addr| (entry.key().clone(), addr.clone()))
            })
            .collect()
    }

    /// An address of the first broker serving `topic`, master preferred.
    pub fn find_broker_addr_by_topic(&self, topic: &CheetahString) -> Option<CheetahString> {
        let snapshot = self.snapshot(topic)?;
        snapshot.route_data.broker_datas.first()?.select_broker_addr()
    }

    pub fn topic_route_data(&self, topic: &CheetahString) -> Option<TopicRouteData> {
        self.snapshot(topic).map(|snapshot| snapshot.route_data.clone())
    }

    pub fn topic_publish_info(&self, topic: &CheetahString) -> Option<Arc<TopicPublishInfo>> {
        self.snapshot(topic).map(|snapshot| snapshot.publish_info.clone())
    }

    pub fn topic_subscribe_info(&self, topic: &CheetahString) -> Option<Arc<Vec<MessageQueue>>> {
        self.snapshot(topic).map(|snapshot| snapshot.subscribe_info.clone())
    }

    /// Topics whose publish info can be sent to.
    pub fn publish_topic_list(&self) -> Vec<CheetahString> {
        let mut topics: Vec<CheetahString> = self
            .tables
            .topic_route_table
            .iter()
            .filter(|entry| entry.publish_info.ok())
            .map(|entry| entry.key().clone())
            .collect();
        topics.sort();
        topics
    }

    pub fn topic_list(&self) -> Vec<CheetahString> {
        let mut topics: Vec<CheetahString> = self
            .tables
            .topic_route_table
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        topics.sort();
        topics
    }

    fn snapshot(&self, topic: &CheetahString) -> Option<Arc<TopicRouteSnapshot>> {
        self.tables
            .topic_route_table
            .get(topic)
            .map(|entry| entry.value().clone())
    }

    fn usable_publish_info(&self, topic: &CheetahString) -> Option<Arc<TopicPublishInfo>> {
        self.topic_publish_info(topic).filter(|info| info.ok())
    }

    async fn lock_topic(&self, topic: &CheetahString) -> RocketMQResult<tokio::sync::OwnedMutexGuard<()>> {
        let lock = self.topic_locks.entry(topic.clone()).or_default().value().clone();
        tokio::time::timeout(Duration::from_millis(LOCK_TIMEOUT_MILLIS), lock.lock_owned())
            .await
            .map_err(|_| {
                warn!("tryLock route lock of topic {} timeout {}ms", topic, LOCK_TIMEOUT_MILLIS);
                RocketMQError::timeout("lock_topic_route", LOCK_TIMEOUT_MILLIS)
            })
    }
}

/// Sendable queues of `route`: the queues listed by an order topic config, otherwise
/// `write_queue_nums` queues of every writable broker that has a master.
pub fn topic_route_data2topic_publish_info(topic: &CheetahString, route: &TopicRouteData) -> TopicPublishInfo {
    let mut info = TopicPublishInfo {
        have_topic_router_info: true,
        topic_route_data: Some(route.clone()),
        ..Default::default()
    };

    if let Some(order_topic_conf) = route.order_topic_conf.as_deref().filter(|conf| !conf.is_empty()) {
        for broker in order_topic_conf.split(';') {
            let Some((broker_name, queue_nums)) = broker.split_once(':') else {
                continue;
            };
            let Ok(queue_nums) = queue_nums.trim().parse::<i32>() else {
                warn!("illegal order topic config {} of topic {}", broker, topic);
                continue;
            };
            for queue_id in 0..queue_nums {
                info.message_queue_list
                    .push(MessageQueue::from_parts(topic.clone(), broker_name.trim(), queue_id));
            }
        }
        info.order_topic = true;
        return info;
    }

    let mut queue_datas = route.queue_datas.clone();
    queue_datas.sort();
    for queue_data in queue_datas.iter().filter(|qd| PermName::is_writeable(qd.perm)) {
        let has_master = route
            .broker_datas
            .iter()
            .find(|bd| bd.broker_name() == &queue_data.broker_name)
            .is_some_and(|bd| bd.master_addr().is_some());
        if !has_master {
            continue;
        }
        for queue_id in 0..queue_data.write_queue_nums {
            info.message_queue_list.push(MessageQueue::from_parts(
                topic.clone(),
                queue_data.broker_name.clone(),
                queue_id as i32,
            ));
        }
    }
    info
}

/// Pullable queues of `route`: `read_queue_nums` queues of every readable broker, sorted.
pub fn topic_route_data2topic_subscribe_info(topic: &CheetahString, route: &TopicRouteData) -> Vec<MessageQueue> {
    let mut queues: Vec<MessageQueue> = route
        .queue_datas
        .iter()
        .filter(|qd| PermName::is_readable(qd.perm))
        .flat_map(|qd| {
            (0..qd.read_queue_nums)
                .map(move |queue_id| MessageQueue::from_parts(topic.clone(), qd.broker_name.clone(), queue_id as i32))
        })
        .collect();
    queues.sort();
    queues
}
