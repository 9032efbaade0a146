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


use std::env;
use std::path::Path;

use cheetah_string::CheetahString;
use rocketmq_common::common::mix_all;
use rocketmq_common::utils::network_util::NetworkUtil;
use rocketmq_common::utils::parse_config_file::parse_config_file;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::runtime::config::client_config::TokioClientConfig;
use serde::Deserialize;
use tracing::warn;

/// Settings of one [`MQClientInstance`](crate::factory::mq_client_instance::MQClientInstance).
///
/// Every field has a default, so a config file only names what it changes. Keys are
/// camelCase (`namesrvAddr`, `heartbeatBrokerInterval`, ...); intervals and timeouts
/// are milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// `;`-separated name server addresses.
    pub namesrv_addr: Option<CheetahString>,
    pub client_ip: Option<CheetahString>,
    pub instance_name: CheetahString,
    pub poll_name_server_interval: u64,
    pub heartbeat_broker_interval: u64,
    pub scan_response_table_interval: u64,
    pub mq_client_api_timeout: u64,
    pub offset_query_timeout: u64,
    pub heartbeat_timeout: u64,
    pub connect_timeout_millis: u64,
    pub default_topic: CheetahString,
    pub default_topic_queue_nums: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        ClientConfig {
            namesrv_addr: Self::namesrv_addr_from_env(),
            client_ip: NetworkUtil::get_local_address().map(CheetahString::from),
            instance_name: CheetahString::from_static_str(mix_all::DEFAULT_INSTANCE_NAME),
            poll_name_server_interval: 30_000,
            heartbeat_broker_interval: 30_000,
            scan_response_table_interval: 1_000,
            mq_client_api_timeout: 3_000,
            offset_query_timeout: 6_000,
            heartbeat_timeout: 3_000,
            connect_timeout_millis: 3_000,
            default_topic: CheetahString::from_static_str(mix_all::AUTO_CREATE_TOPIC_KEY_TOPIC),
            default_topic_queue_nums: mix_all::DEFAULT_TOPIC_QUEUE_NUMS as u32,
        }
    }

    /// Reads a TOML, YAML or JSON file. A missing `namesrvAddr` falls back to the
    /// environment like [`ClientConfig::new`] does.
    pub fn load(path: impl AsRef<Path>) -> RocketMQResult<ClientConfig> {
        let mut config: ClientConfig = parse_config_file(path)?;
        if config.namesrv_addr.is_none() {
            config.namesrv_addr = Self::namesrv_addr_from_env();
        }
        if config.client_ip.is_none() {
            config.client_ip = NetworkUtil::get_local_address().map(CheetahString::from);
        }
        Ok(config)
    }

    fn namesrv_addr_from_env() -> Option<CheetahString> {
        env::var(mix_all::NAMESRV_ADDR_ENV)
            .or_else(|_| env::var(mix_all::NAMESRV_ADDR_PROPERTY))
            .ok()
            .filter(|addr| !addr.trim().is_empty())
            .map(CheetahString::from)
    }

    #[inline]
    pub fn set_namesrv_addr(&mut self, namesrv_addr: impl Into<CheetahString>) {
        self.namesrv_addr = Some(namesrv_addr.into());
    }

    #[inline]
    pub fn set_instance_name(&mut self, instance_name: impl Into<CheetahString>) {
        self.instance_name = instance_name.into();
    }

    /// The configured name servers. Blanks and entries that are not `host:port` are dropped.
    pub fn namesrv_addr_list(&self) -> Vec<CheetahString> {
        self.namesrv_addr
            .as_ref()
            .map(|addrs| {
                addrs
                    .as_str()
                    .split(';')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .filter(|addr| {
                        let valid = NetworkUtil::split_host_port(addr).is_some();
                        if !valid {
                            warn!("ignoring malformed name server address [{}]", addr);
                        }
                        valid
                    })
                    .map(CheetahString::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn change_instance_name_to_pid(&mut self) {
        if self.instance_name.as_str() == mix_all::DEFAULT_INSTANCE_NAME {
            self.instance_name = CheetahString::from(std::process::id().to_string());
        }
    }

    /// `ip@instance`, where an unchanged instance name stands for the process id.
    pub fn build_mq_client_id(&self) -> String {
        let ip = self.client_ip.as_ref().map(|ip| ip.as_str()).unwrap_or("127.0.0.1");
        if self.instance_name.as_str() == mix_all::DEFAULT_INSTANCE_NAME {
            format!("{}@{}", ip, std::process::id())
        } else {
            format!("{}@{}", ip, self.instance_name)
        }
    }

    pub fn tokio_client_config(&self) -> TokioClientConfig {
        TokioClientConfig {
            connect_timeout_millis: self.connect_timeout_millis,
            ..TokioClientConfig::default()
        }
    }
}
