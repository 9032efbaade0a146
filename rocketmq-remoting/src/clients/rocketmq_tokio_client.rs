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
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use tokio::sync::oneshot;
use tokio::time;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::response_future::ResponseFuture;
use crate::base::response_table::ResponseTable;
use crate::clients::client::Client;
use crate::clients::client::ConnectionTable;
use crate::protocol::remoting_command::RemotingCommand;
use crate::remoting::InvokeCallback;
use crate::request_processor::default_request_processor::DefaultRemotingRequestProcessor;
use crate::runtime::config::client_config::TokioClientConfig;
use crate::runtime::processor::RequestProcessor;

/// Multiplexing remoting client.
///
/// Keeps at most one connection per peer address and correlates responses with
/// requests through a single [`ResponseTable`] shared by all of them. An absent
/// address means "a name server", chosen round-robin from the configured list and
/// kept until its connection fails.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use rocketmq_remoting::clients::RocketmqDefaultClient;
/// use rocketmq_remoting::code::request_code::RequestCode;
/// use rocketmq_remoting::protocol::header::client_request_header::GetRouteInfoRequestHeader;
/// use rocketmq_remoting::protocol::remoting_command::RemotingCommand;
/// use rocketmq_remoting::request_processor::default_request_processor::DefaultRemotingRequestProcessor;
/// use rocketmq_remoting::runtime::config::client_config::TokioClientConfig;
///
/// # async fn example() -> rocketmq_error::RocketMQResult<()> {
/// let client = RocketmqDefaultClient::new(
///     Arc::new(TokioClientConfig::default()),
///     DefaultRemotingRequestProcessor,
/// );
/// client.update_name_server_address_list(vec!["127.0.0.1:9876".into()]);
///
/// let request = RemotingCommand::create_request_command(
///     RequestCode::GetRouteinfoByTopic,
///     GetRouteInfoRequestHeader::new("TopicTest"),
/// );
/// let response = client.invoke_sync(None, request, 3000).await?;
/// # let _ = response;
/// # Ok(())
/// # }
/// ```
pub struct RocketmqDefaultClient<PR = DefaultRemotingRequestProcessor> {
    tokio_client_config: Arc<TokioClientConfig>,
    connection_tables: Arc<ConnectionTable>,
    response_table: Arc<ResponseTable>,
    namesrv_addr_list: RwLock<Vec<CheetahString>>,
    namesrv_addr_choosed: RwLock<Option<CheetahString>>,
    namesrv_index: AtomicUsize,
    /// Per-address connect locks so one address never ends up with two connections.
    connect_locks: DashMap<CheetahString, Arc<tokio::sync::Mutex<()>>>,
    processor: Arc<PR>,
}

impl<PR> RocketmqDefaultClient<PR>
where
    PR: RequestProcessor + Sync + 'static,
{
    pub fn new(tokio_client_config: Arc<TokioClientConfig>, processor: PR) -> Self {
        Self {
            tokio_client_config,
            connection_tables: Arc::new(ConnectionTable::new()),
            response_table: Arc::new(ResponseTable::new()),
            namesrv_addr_list: RwLock::new(Vec::new()),
            namesrv_addr_choosed: RwLock::new(None),
            namesrv_index: AtomicUsize::new(init_value_index()),
            connect_locks: DashMap::new(),
            processor: Arc::new(processor),
        }
    }

    pub fn processor(&self) -> &Arc<PR> {
        &self.processor
    }

    pub fn response_table(&self) -> &Arc<ResponseTable> {
        &self.response_table
    }

    /// Replaces the name server list when its content changed.
    ///
    /// A chosen name server that is no longer listed is disconnected.
    pub fn update_name_server_address_list(&self, addrs: Vec<CheetahString>) {
        if addrs.is_empty() {
            return;
        }
        let mut current = self.namesrv_addr_list.write();
        let changed = current.len() != addrs.len() || addrs.iter().any(|addr| !current.contains(addr));
        if !changed {
            return;
        }
        let mut addrs = addrs;
        addrs.shuffle(&mut rand::rng());
        info!("name server address updated. NEW : {:?} , OLD: {:?}", addrs, *current);
        *current = addrs;

        let mut choosed = self.namesrv_addr_choosed.write();
        if let Some(addr) = choosed.as_ref() {
            if !current.contains(addr) {
                if let Some((_, client)) = self.connection_tables.remove(addr) {
                    client.close();
                }
                *choosed = None;
            }
        }
    }

    pub fn get_name_server_address_list(&self) -> Vec<CheetahString> {
        self.namesrv_addr_list.read().clone()
    }

    /// Sends `request` and waits up to `timeout_millis` for the matching response.
    ///
    /// The wait is bounded locally: when it runs out the pending entry is removed
    /// and [`RocketMQError::Timeout`] is returned, whether or not the sweep ran.
    /// Time spent connecting and waiting for room in the write queue counts against
    /// the same budget.
    pub async fn invoke_sync(
        &self,
        addr: Option<&CheetahString>,
        request: RemotingCommand,
        timeout_millis: u64,
    ) -> RocketMQResult<RemotingCommand> {
        let deadline = Instant::now() + Duration::from_millis(timeout_millis);
        let client = self.connect_before(addr, deadline, "invoke_sync", timeout_millis).await?;
        let (opaque, rx) = self
            .register_and_send(&client, request, deadline, "invoke_sync", timeout_millis)
            .await?;
        match time::timeout_at(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RocketMQError::connection_closed(client.addr().as_str())),
            Err(_) => {
                self.response_table.remove(opaque);
                warn!(
                    "invoke_sync to {} timed out after {}ms, opaque={}",
                    client.addr(),
                    timeout_millis,
                    opaque
                );
                Err(RocketMQError::timeout("invoke_sync", timeout_millis))
            }
        }
    }

    /// Sends `request` and returns once it is queued for writing.
    ///
    /// `callback` runs exactly once: with the response, with a timeout, or with the
    /// error that prevented sending or ended the connection.
    pub async fn invoke_async(
        &self,
        addr: Option<&CheetahString>,
        request: RemotingCommand,
        timeout_millis: u64,
        callback: impl InvokeCallback,
    ) {
        let deadline = Instant::now() + Duration::from_millis(timeout_millis);
        let client = match self.connect_before(addr, deadline, "invoke_async", timeout_millis).await {
            Ok(client) => client,
            Err(e) => {
                callback.operation_complete(Err(e));
                return;
            }
        };
        let (opaque, rx) = match self
            .register_and_send(&client, request, deadline, "invoke_async", timeout_millis)
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                callback.operation_complete(Err(e));
                return;
            }
        };

        let response_table = self.response_table.clone();
        tokio::spawn(async move {
            let result = match time::timeout_at(deadline, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(RocketMQError::connection_closed(client.addr().as_str())),
                Err(_) => {
                    response_table.remove(opaque);
                    Err(RocketMQError::timeout("invoke_async", timeout_millis))
                }
            };
            callback.operation_complete(result);
        });
    }

    /// Sends `request` flagged oneway. Nothing is registered and no response is expected.
    ///
    /// The command is queued without waiting, so a full write queue fails the call
    /// at once. Only a missing connection is waited for, up to the connect timeout.
    pub async fn invoke_oneway(&self, addr: Option<&CheetahString>, request: RemotingCommand) -> RocketMQResult<()> {
        let connect_timeout_millis = self.tokio_client_config.connect_timeout_millis;
        let deadline = Instant::now() + Duration::from_millis(connect_timeout_millis);
        let client = self
            .connect_before(addr, deadline, "invoke_oneway", connect_timeout_millis)
            .await?;
        client.try_send(request.mark_oneway_rpc())
    }

    /// Fails every invocation past its deadline. Returns how many were expired.
    pub fn scan_response_table(&self) -> usize {
        self.response_table.scan_expired(Instant::now())
    }

    pub fn pending_requests(&self) -> usize {
        self.response_table.len()
    }

    pub fn is_connected(&self, addr: &CheetahString) -> bool {
        self.connection_tables
            .get(addr)
            .is_some_and(|client| !client.is_closed())
    }

    pub fn close_client(&self, addr: &CheetahString) {
        if let Some((_, client)) = self.connection_tables.remove(addr) {
            info!("Closing connection to {}", addr);
            client.close();
        }
    }

    /// Closes every connection; invocations still pending fail with `ConnectionClosed`.
    pub fn shutdown(&self) {
        let addrs: Vec<CheetahString> = self.connection_tables.iter().map(|entry| entry.key().clone()).collect();
        for addr in addrs {
            self.close_client(&addr);
        }
        info!("Remoting client shut down");
    }

    async fn connect_before(
        &self,
        addr: Option<&CheetahString>,
        deadline: Instant,
        operation: &'static str,
        timeout_millis: u64,
    ) -> RocketMQResult<Client> {
        match time::timeout_at(deadline, self.get_and_create_client(addr)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} to {:?} timed out after {}ms while connecting",
                    operation, addr, timeout_millis
                );
                Err(RocketMQError::timeout(operation, timeout_millis))
            }
        }
    }

    /// Registers the pending response, then queues `request` for writing before `deadline`.
    async fn register_and_send(
        &self,
        client: &Client,
        mut request: RemotingCommand,
        deadline: Instant,
        operation: &'static str,
        timeout_millis: u64,
    ) -> RocketMQResult<(i32, oneshot::Receiver<RocketMQResult<RemotingCommand>>)> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RocketMQError::timeout(operation, timeout_millis));
        }
        let opaque = RemotingCommand::next_opaque();
        request.set_opaque_mut(opaque);
        let (tx, rx) = oneshot::channel();
        self.response_table.insert(ResponseFuture::new(
            opaque,
            client.addr().clone(),
            client.connection_id().clone(),
            remaining.as_millis() as u64,
            tx,
        ));
        if let Err(e) = client.send_timeout(request, remaining).await {
            self.response_table.remove(opaque);
            return Err(e);
        }
        Ok((opaque, rx))
    }

    async fn get_and_create_client(&self, addr: Option<&CheetahString>) -> RocketMQResult<Client> {
        match addr {
            Some(addr) if !addr.as_str().is_empty() => self.create_client(addr).await,
            _ => self.get_and_create_nameserver_client().await,
        }
    }

    async fn get_and_create_nameserver_client(&self) -> RocketMQResult<Client> {
        let cached = self.namesrv_addr_choosed.read().clone();
        if let Some(addr) = cached {
            if let Some(client) = self.live_client(&addr) {
                return Ok(client);
            }
        }

        let addr_list = self.get_name_server_address_list();
        if addr_list.is_empty() {
            return Err(RocketMQError::illegal_argument("name server address list is empty"));
        }

        let mut last_error = None;
        for _ in 0..addr_list.len() {
            let index = self.namesrv_index.fetch_add(1, Ordering::Relaxed) % addr_list.len();
            let addr = &addr_list[index];
            match self.create_client(addr).await {
                Ok(client) => {
                    info!("new name server is chosen. NEW: {}", addr);
                    *self.namesrv_addr_choosed.write() = Some(addr.clone());
                    return Ok(client);
                }
                Err(e) => {
                    warn!("Name server {} unavailable: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| RocketMQError::illegal_argument("no name server reachable")))
    }

    fn live_client(&self, addr: &CheetahString) -> Option<Client> {
        let client = self.connection_tables.get(addr)?.value().clone();
        if client.is_closed() {
            debug!("Cached connection to {} is closed", addr);
            return None;
        }
        Some(client)
    }

    async fn create_client(&self, addr: &CheetahString) -> RocketMQResult<Client> {
        if let Some(client) = self.live_client(addr) {
            return Ok(client);
        }
        let lock = self.connect_locks.entry(addr.clone()).or_default().value().clone();
        let _guard = lock.lock().await;
        if let Some(client) = self.live_client(addr) {
            return Ok(client);
        }
        let client = Client::connect(
            addr,
            &self.tokio_client_config,
            self.response_table.clone(),
            self.connection_tables.clone(),
            self.processor.clone(),
        )
        .await?;
        self.connection_tables.insert(addr.clone(), client.clone());
        Ok(client)
    }
}

fn init_value_index() -> usize {
    let mut rng = rand::rng();
    rng.random_range(0..999)
}
