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


//! Subscribes a consumer group to a topic and drives one pull request per queue
//! through the shared pull request queue until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use rocketmq_client_runtime::base::client_config::ClientConfig;
use rocketmq_client_runtime::consumer::consumer_impl::process_queue::ProcessQueue;
use rocketmq_client_runtime::consumer::consumer_impl::pull_request::PullRequest;
use rocketmq_client_runtime::factory::mq_client_instance::MQClientInstance;
use rocketmq_common::log::init_logger;
use rocketmq_common::TimeUtils::get_current_millis;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::protocol::heartbeat::consume_type::ConsumeType;
use rocketmq_remoting::protocol::heartbeat::consumer_data::ConsumerData;
use rocketmq_remoting::protocol::heartbeat::subscription_data::SubscriptionData;
use rocketmq_rust::wait_for_signal;
use tracing::info;
use tracing::warn;

const CONSUMER_GROUP: &str = "please_rename_unique_group_name";
const TOPIC: &str = "TopicTest";
const WORKERS: usize = 2;

#[tokio::main]
async fn main() -> RocketMQResult<()> {
    init_logger();

    let instance = Arc::new(MQClientInstance::new(ClientConfig::new()));
    instance.register_consumer(ConsumerData {
        group_name: CheetahString::from_static_str(CONSUMER_GROUP),
        consume_type: ConsumeType::ConsumeActively,
        subscription_data_set: vec![SubscriptionData::new(TOPIC, "*")],
        ..Default::default()
    });
    instance.set_rebalance_hook(Arc::new(|group: &CheetahString| {
        info!("consumer set of {} changed", group);
    }));
    instance.start()?;

    let topic = CheetahString::from_static_str(TOPIC);
    instance.update_topic_route_info(&topic).await?;
    let queues = instance.topic_subscribe_info(&topic).unwrap_or_default();
    for mq in queues.iter() {
        let offset = instance.get_max_offset(mq).await.max(0);
        instance.enqueue_pull_request(PullRequest::new(
            CheetahString::from_static_str(CONSUMER_GROUP),
            mq.clone(),
            Arc::new(ProcessQueue::new()),
            offset,
        ));
    }
    info!("dispatching {} pull request(s) to {} worker(s)", queues.len(), WORKERS);

    let mut workers = Vec::with_capacity(WORKERS);
    for worker in 0..WORKERS {
        let instance = instance.clone();
        workers.push(tokio::spawn(async move {
            loop {
                let mut pull_request = instance.pull_request_queue().dequeue_active().await;
                pull_request
                    .get_process_queue()
                    .set_last_pull_timestamp(get_current_millis());
                let max_offset = instance.get_max_offset(pull_request.get_message_queue()).await;
                if max_offset < 0 {
                    warn!("worker {} could not reach {}", worker, pull_request.get_message_queue());
                } else if max_offset > pull_request.get_next_offset() {
                    info!(
                        "worker {}: {} has {} new message(s)",
                        worker,
                        pull_request.get_message_queue(),
                        max_offset - pull_request.get_next_offset()
                    );
                    pull_request.set_next_offset(max_offset);
                }
                instance.enqueue_pull_request_later(pull_request, Duration::from_secs(1));
            }
        }));
    }

    wait_for_signal().await;
    for worker in workers {
        worker.abort();
    }
    instance.shutdown().await;
    Ok(())
}
