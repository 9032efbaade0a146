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


//! Resolves the publish route of a topic and prints the max offset of every queue.
//!
//! ```text
//! NAMESRV_ADDR=127.0.0.1:9876 cargo run --example route-lookup -- TopicTest [client.toml]
//! ```

use std::sync::Arc;

use cheetah_string::CheetahString;
use rocketmq_client_runtime::base::client_config::ClientConfig;
use rocketmq_client_runtime::factory::mq_client_instance::MQClientInstance;
use rocketmq_common::log::init_logger;
use rocketmq_error::RocketMQResult;
use tracing::info;

#[tokio::main]
async fn main() -> RocketMQResult<()> {
    init_logger();

    let mut args = std::env::args().skip(1);
    let topic = CheetahString::from(args.next().unwrap_or_else(|| "TopicTest".to_string()));
    let client_config = match args.next() {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::new(),
    };

    let instance = Arc::new(MQClientInstance::new(client_config));
    instance.start()?;

    let publish_info = instance.resolve_publish_info(&topic).await?;
    info!(
        "topic {} has {} writable queue(s), order topic: {}",
        topic,
        publish_info.message_queue_list.len(),
        publish_info.order_topic
    );
    for mq in &publish_info.message_queue_list {
        info!("{} max offset {}", mq, instance.get_max_offset(mq).await);
    }

    instance.shutdown().await;
    Ok(())
}
