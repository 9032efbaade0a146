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


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cheetah_string::CheetahString;
use dashmap::DashMap;
use futures::future;
use rocketmq_common::common::message::message_queue::MessageQueue;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::clients::RocketmqDefaultClient;
use rocketmq_remoting::protocol::heartbeat::consumer_data::ConsumerData;
use rocketmq_remoting::protocol::heartbeat::heartbeat_data::HeartbeatData;
use rocketmq_remoting::protocol::heartbeat::producer_data::ProducerData;
use rocketmq_rust::ScheduleMode;
use rocketmq_rust::ScheduledTaskManager;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::base::client_config::ClientConfig;
use crate::consumer::consumer_impl::pull_request::PullRequest;
use crate::consumer::consumer_impl::pull_request_queue::PullRequestQueue;
use crate::factory::client_tables::ClientTables;
use crate::factory::topic_route_manager::TopicRouteManager;
use crate::implementation::client_remoting_processor::ClientRemotingProcessor;
use crate::implementation::client_remoting_processor::RebalanceHook;
use crate::implementation::find_broker_result::FindBrokerResult;
use crate::implementation::mq_client_api_impl::MQClientAPIImpl;
use crate::producer::producer_impl::topic_publish_info::TopicPublishInfo;

/// Offset reported when the broker could not be asked.
pub const UNKNOWN_OFFSET: i64 = -1;

/// Outcome of one heartbeat round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatSummary {
    /// Master addresses that acknowledged the heartbeat.
    pub succeeded: Vec<CheetahString>,
    /// Master addresses that failed, with the reason.
    pub failed: Vec<(CheetahString, String)>,
}

impl HeartbeatSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// The client runtime shared by the producers and consumers of one process.
///
/// Owns the remoting client, the route tables, the pull request queue and the three
/// background tasks: route refresh, heartbeat and response table sweep.
pub struct MQClientInstance {
    client_config: Arc<ClientConfig>,
    client_id: CheetahString,
    client_remoting_processor: ClientRemotingProcessor,
    mq_client_api_impl: Arc<MQClientAPIImpl>,
    route_manager: Arc<TopicRouteManager<MQClientAPIImpl>>,
    pull_request_queue: PullRequestQueue,
    producer_table: DashMap<CheetahString, ProducerData>,
    consumer_table: DashMap<CheetahString, ConsumerData>,
    scheduled_task_manager: ScheduledTaskManager,
    lock_heartbeat: tokio::sync::Mutex<()>,
    started: AtomicBool,
}

impl MQClientInstance {
    pub fn new(client_config: ClientConfig) -> Self {
        Self::with_tables(client_config, ClientTables::new())
    }

    /// Builds an instance over caller-owned route tables.
    pub fn with_tables(client_config: ClientConfig, tables: ClientTables) -> Self {
        let client_config = Arc::new(client_config);
        let client_id = CheetahString::from(client_config.build_mq_client_id());
        let client_remoting_processor = ClientRemotingProcessor::new();
        let mq_client_api_impl = Arc::new(MQClientAPIImpl::new(
            Arc::new(client_config.tokio_client_config()),
            client_remoting_processor.clone(),
        ));
        mq_client_api_impl.update_name_server_address_list(client_config.namesrv_addr_list());
        let route_manager = Arc::new(TopicRouteManager::new(
            mq_client_api_impl.clone(),
            tables,
            &client_config,
        ));
        info!("Created a new client Instance, ClientID: {}", client_id);
        MQClientInstance {
            client_config,
            client_id,
            client_remoting_processor,
            mq_client_api_impl,
            route_manager,
            pull_request_queue: PullRequestQueue::new(),
            producer_table: DashMap::new(),
            consumer_table: DashMap::new(),
            scheduled_task_manager: ScheduledTaskManager::new(),
            lock_heartbeat: tokio::sync::Mutex::new(()),
            started: AtomicBool::new(false),
        }
    }

    /// `ip@pid` unless an instance name was configured.
    pub fn client_id(&self) -> &CheetahString {
        &self.client_id
    }

    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    pub fn route_manager(&self) -> &Arc<TopicRouteManager<MQClientAPIImpl>> {
        &self.route_manager
    }

    pub fn mq_client_api_impl(&self) -> &Arc<MQClientAPIImpl> {
        &self.mq_client_api_impl
    }

    pub fn remoting_client(&self) -> &Arc<RocketmqDefaultClient<ClientRemotingProcessor>> {
        self.mq_client_api_impl.remoting_client()
    }

    pub fn set_rebalance_hook(&self, hook: RebalanceHook) {
        self.client_remoting_processor.set_rebalance_hook(hook);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Registers the background tasks. No connection is opened until first use.
    pub fn start(self: &Arc<Self>) -> RocketMQResult<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RocketMQError::ClientAlreadyStarted);
        }
        self.start_scheduled_task();
        info!("the client factory [{}] start OK", self.client_id);
        Ok(())
    }

    /// Stops the background tasks and closes every connection.
    pub async fn shutdown(&self) {
        if !self.started.swap(false, Ordering::AcqRel) {
            warn!("MQClientInstance[{}] is not running, ignoring shutdown", self.client_id);
            return;
        }
        self.scheduled_task_manager.cancel_all().await;
        self.mq_client_api_impl.shutdown();
        info!("the client factory [{}] shutdown OK", self.client_id);
    }

    fn start_scheduled_task(self: &Arc<Self>) {
        let instance = self.clone();
        self.scheduled_task_manager.add_scheduled_task(
            "update_topic_route_info_from_name_server",
            ScheduleMode::FixedRateNoOverlap,
            Duration::from_millis(10),
            Duration::from_millis(self.client_config.poll_name_server_interval),
            move |_token| {
                let instance = instance.clone();
                async move {
                    instance.update_topic_route_info_from_name_server().await;
                    Ok(())
                }
            },
        );

        let instance = self.clone();
        self.scheduled_task_manager.add_scheduled_task(
            "send_heartbeat_to_all_broker",
            ScheduleMode::FixedRateNoOverlap,
            Duration::from_secs(1),
            Duration::from_millis(self.client_config.heartbeat_broker_interval),
            move |_token| {
                let instance = instance.clone();
                async move {
                    instance.send_heartbeat_to_all_broker_with_lock().await;
                    Ok(())
                }
            },
        );

        let instance = self.clone();
        self.scheduled_task_manager.add_scheduled_task(
            "scan_response_table",
            ScheduleMode::FixedRate,
            Duration::from_millis(self.client_config.scan_response_table_interval),
            Duration::from_millis(self.client_config.scan_response_table_interval),
            move |_token| {
                let instance = instance.clone();
                async move {
                    instance.clear_expire_response();
                    Ok(())
                }
            },
        );
    }

    /// Refreshes every cached topic and every topic a registered consumer subscribes to.
    pub async fn update_topic_route_info_from_name_server(&self) {
        let subscribed: Vec<CheetahString> = self
            .consumer_table
            .iter()
            .flat_map(|entry| {
                entry
                    .subscription_data_set
                    .iter()
                    .map(|subscription| subscription.topic.clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        self.route_manager.update_all_topic_route_info(&subscribed).await;
    }

    pub async fn update_topic_route_info(&self, topic: &CheetahString) -> RocketMQResult<bool> {
        self.route_manager.update_route_info(topic).await
    }

    pub async fn resolve_publish_info(&self, topic: &CheetahString) -> RocketMQResult<Arc<TopicPublishInfo>> {
        self.route_manager.resolve_publish_info(topic).await
    }

    pub fn resolve_broker_address(
        &self,
        broker_name: &CheetahString,
        broker_id: u64,
        only_this_broker: bool,
    ) -> Option<FindBrokerResult> {
        self.route_manager
            .resolve_broker_address(broker_name, broker_id, only_this_broker)
    }

    pub fn find_broker_address_in_publish(&self, broker_name: &CheetahString) -> Option<CheetahString> {
        self.route_manager.master_address(broker_name)
    }

    pub fn topic_subscribe_info(&self, topic: &CheetahString) -> Option<Arc<Vec<MessageQueue>>> {
        self.route_manager.topic_subscribe_info(topic)
    }

    pub fn publish_topic_list(&self) -> Vec<CheetahString> {
        self.route_manager.publish_topic_list()
    }

    /// Returns `false` when the group is already registered.
    pub fn register_producer(&self, group: impl Into<CheetahString>) -> bool {
        let group = group.into();
        if self.producer_table.contains_key(&group) {
            warn!("the producer group [{}] exist already.", group);
            return false;
        }
        self.producer_table.insert(group.clone(), ProducerData::new(group));
        true
    }

    pub fn unregister_producer(&self, group: &CheetahString) {
        self.producer_table.remove(group);
    }

    /// Returns `false` when the group is already registered.
    pub fn register_consumer(&self, consumer_data: ConsumerData) -> bool {
        if self.consumer_table.contains_key(&consumer_data.group_name) {
            warn!("the consumer group [{}] exist already.", consumer_data.group_name);
            return false;
        }
        self.consumer_table
            .insert(consumer_data.group_name.clone(), consumer_data);
        true
    }

    pub fn unregister_consumer(&self, group: &CheetahString) {
        self.consumer_table.remove(group);
    }

    pub fn prepare_heartbeat_data(&self) -> HeartbeatData {
        HeartbeatData {
            client_id: self.client_id.clone(),
            producer_data_set: self.producer_table.iter().map(|entry| entry.value().clone()).collect(),
            consumer_data_set: self.consumer_table.iter().map(|entry| entry.value().clone()).collect(),
        }
    }

    /// Sends `heartbeat_data` to every known master at once.
    ///
    /// A broker that fails is logged and reported in the summary. Only a payload
    /// that cannot be encoded fails the call.
    pub async fn send_heartbeat_to_all_broker(&self, heartbeat_data: &HeartbeatData) -> RocketMQResult<HeartbeatSummary> {
        let body = Bytes::from(heartbeat_data.encode()?);
        let masters = self.route_manager.master_addresses();
        let timeout_millis = self.client_config.heartbeat_timeout;

        let results = future::join_all(masters.into_iter().map(|(broker_name, addr)| {
            let body = body.clone();
            async move {
                let result = self
                    .mq_client_api_impl
                    .send_heartbeat(&addr, body, timeout_millis)
                    .await;
                (broker_name, addr, result)
            }
        }))
        .await;

        let mut summary = HeartbeatSummary::default();
        for (broker_name, addr, result) in results {
            match result {
                Ok(()) => summary.succeeded.push(addr),
                Err(e) => {
                    error!("send heart beat to broker[{} {}] failed: {}", broker_name, addr, e);
                    summary.failed.push((addr, e.to_string()));
                }
            }
        }
        debug!(
            "send heart beat to all brokers, {}/{} succeeded",
            summary.succeeded.len(),
            summary.total()
        );
        Ok(summary)
    }

    /// Heartbeat round of the background task. Skipped while another round runs.
    pub async fn send_heartbeat_to_all_broker_with_lock(&self) -> Option<HeartbeatSummary> {
        let Ok(_guard) = self.lock_heartbeat.try_lock() else {
            warn!("lock heartBeat, but failed. [{}]", self.client_id);
            return None;
        };
        let heartbeat_data = self.prepare_heartbeat_data();
        if heartbeat_data.is_empty() {
            debug!("sending heartbeat, but no consumer and no producer. [{}]", self.client_id);
            return None;
        }
        match self.send_heartbeat_to_all_broker(&heartbeat_data).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("encode heartbeat data failed: {}", e);
                None
            }
        }
    }

    /// Max offset of `mq` on its master, or [`UNKNOWN_OFFSET`] when it cannot be asked.
    pub async fn get_max_offset(&self, mq: &MessageQueue) -> i64 {
        let Some(addr) = self.find_master_for_queue(mq).await else {
            warn!("get max offset of {} failed, broker {} not found", mq, mq.get_broker_name());
            return UNKNOWN_OFFSET;
        };
        match self
            .mq_client_api_impl
            .get_max_offset(&addr, mq, self.client_config.offset_query_timeout)
            .await
        {
            Ok(offset) => offset,
            Err(e) => {
                warn!("get max offset of {} from {} failed: {}", mq, addr, e);
                UNKNOWN_OFFSET
            }
        }
    }

    /// Offset of the first message of `mq` stored at or after `timestamp` (epoch millis),
    /// or [`UNKNOWN_OFFSET`] when the broker cannot be asked.
    pub async fn search_offset(&self, mq: &MessageQueue, timestamp: i64) -> i64 {
        let Some(addr) = self.find_master_for_queue(mq).await else {
            warn!("search offset of {} failed, broker {} not found", mq, mq.get_broker_name());
            return UNKNOWN_OFFSET;
        };
        match self
            .mq_client_api_impl
            .search_offset(&addr, mq, timestamp, self.client_config.offset_query_timeout)
            .await
        {
            Ok(offset) => offset,
            Err(e) => {
                warn!("search offset of {} from {} failed: {}", mq, addr, e);
                UNKNOWN_OFFSET
            }
        }
    }

    /// Master of the queue's broker, resolving the topic's publish info once if it is unknown.
    async fn find_master_for_queue(&self, mq: &MessageQueue) -> Option<CheetahString> {
        if let Some(addr) = self.route_manager.master_address(mq.get_broker_name()) {
            return Some(addr);
        }
        if let Err(e) = self.route_manager.resolve_publish_info(mq.get_topic()).await {
            debug!("refresh route of {} failed: {}", mq.get_topic(), e);
        }
        self.route_manager.master_address(mq.get_broker_name())
    }

    pub fn pull_request_queue(&self) -> &PullRequestQueue {
        &self.pull_request_queue
    }

    pub fn enqueue_pull_request(&self, pull_request: PullRequest) {
        self.pull_request_queue.enqueue(pull_request);
    }

    pub fn enqueue_pull_request_later(&self, pull_request: PullRequest, delay: Duration) {
        self.pull_request_queue.enqueue_later(pull_request, delay);
    }

    pub async fn dequeue_pull_request(&self) -> PullRequest {
        self.pull_request_queue.dequeue().await
    }

    /// Fails pending invocations past their deadline. Returns how many there were.
    pub fn clear_expire_response(&self) -> usize {
        let expired = self.mq_client_api_impl.scan_response_table();
        if expired > 0 {
            debug!("removed {} expired responses", expired);
        }
        expired
    }
}
