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

use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use dashmap::DashMap;
use futures::SinkExt;
use futures::StreamExt;
use rocketmq_error::NetworkError;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::base::response_table::ResponseTable;
use crate::code::response_code::RemotingSysResponseCode;
use crate::connection::Connection;
use crate::connection::ConnectionId;
use crate::connection::InboundStream;
use crate::connection::OutboundSink;
use crate::protocol::remoting_command::RemotingCommand;
use crate::runtime::config::client_config::TokioClientConfig;
use crate::runtime::processor::RequestProcessor;

/// Live clients keyed by peer address.
pub type ConnectionTable = DashMap<CheetahString, Client>;

/// Handle to one connection.
///
/// Writes go through a queue drained by a dedicated writer task. A reader task
/// routes responses into the shared [`ResponseTable`] and hands requests to the
/// processor. When either side fails, the connection is cancelled, removed from
/// the [`ConnectionTable`], and every invocation still waiting on it is failed.
#[derive(Clone)]
pub struct Client {
    addr: CheetahString,
    connection_id: ConnectionId,
    tx: mpsc::Sender<RemotingCommand>,
    cancel: CancellationToken,
}

struct ReaderContext<PR> {
    addr: CheetahString,
    connection_id: ConnectionId,
    tx: mpsc::Sender<RemotingCommand>,
    cancel: CancellationToken,
    response_table: Arc<ResponseTable>,
    connection_tables: Arc<ConnectionTable>,
    processor: Arc<PR>,
}

impl Client {
    pub(crate) async fn connect<PR>(
        addr: &CheetahString,
        config: &TokioClientConfig,
        response_table: Arc<ResponseTable>,
        connection_tables: Arc<ConnectionTable>,
        processor: Arc<PR>,
    ) -> RocketMQResult<Client>
    where
        PR: RequestProcessor + Sync + 'static,
    {
        let connect_timeout = Duration::from_millis(config.connect_timeout_millis);
        let stream = match time::timeout(connect_timeout, TcpStream::connect(addr.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RocketMQError::network_connection_failed(addr.as_str(), e.to_string()));
            }
            Err(_) => {
                return Err(NetworkError::connection_timeout(addr.as_str(), config.connect_timeout_millis).into());
            }
        };
        let connection = Connection::new(stream, config)?;
        let connection_id = connection.connection_id().clone();
        info!(
            "Connected to {} ({} -> {}), connection id {}",
            addr,
            connection.local_addr(),
            connection.remote_addr(),
            connection_id
        );

        let (outbound_sink, inbound_stream) = connection.into_split();
        let (tx, rx) = mpsc::channel(config.write_queue_capacity.max(1));
        let cancel = CancellationToken::new();

        tokio::spawn(run_send(outbound_sink, rx, cancel.clone(), addr.clone()));
        tokio::spawn(run_recv(
            inbound_stream,
            ReaderContext {
                addr: addr.clone(),
                connection_id: connection_id.clone(),
                tx: tx.clone(),
                cancel: cancel.clone(),
                response_table,
                connection_tables,
                processor,
            },
        ));

        Ok(Client {
            addr: addr.clone(),
            connection_id,
            tx,
            cancel,
        })
    }

    pub fn addr(&self) -> &CheetahString {
        &self.addr
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queues a command for the writer task.
    ///
    /// Waits at most `timeout` for room in the write queue.
    pub async fn send_timeout(&self, command: RemotingCommand, timeout: Duration) -> RocketMQResult<()> {
        if self.is_closed() {
            return Err(RocketMQError::connection_closed(self.addr.as_str()));
        }
        self.tx.send_timeout(command, timeout).await.map_err(|e| match e {
            SendTimeoutError::Timeout(command) => {
                warn!(
                    "write queue to {} stayed full for {}ms, opaque={}",
                    self.addr,
                    timeout.as_millis(),
                    command.opaque()
                );
                RocketMQError::timeout("send", timeout.as_millis() as u64)
            }
            SendTimeoutError::Closed(_) => NetworkError::send_failed(self.addr.as_str(), "writer task stopped").into(),
        })
    }

    /// Queues a command without waiting. A full write queue is a send failure.
    pub fn try_send(&self, command: RemotingCommand) -> RocketMQResult<()> {
        if self.is_closed() {
            return Err(RocketMQError::connection_closed(self.addr.as_str()));
        }
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => NetworkError::send_failed(self.addr.as_str(), "write queue full").into(),
            TrySendError::Closed(_) => NetworkError::send_failed(self.addr.as_str(), "writer task stopped").into(),
        })
    }

    /// Tears the connection down. Pending invocations on it fail with `ConnectionClosed`.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

async fn run_send(
    mut outbound_sink: OutboundSink,
    mut rx: mpsc::Receiver<RemotingCommand>,
    cancel: CancellationToken,
    addr: CheetahString,
) {
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = rx.recv() => command,
        };
        let Some(command) = command else {
            break;
        };
        let opaque = command.opaque();
        if let Err(e) = outbound_sink.send(command).await {
            warn!("Failed to write command opaque={} to {}: {}", opaque, addr, e);
            cancel.cancel();
            break;
        }
    }
    if let Err(e) = outbound_sink.close().await {
        debug!("Closing writer of {} failed: {}", addr, e);
    }
}

async fn run_recv<PR>(mut inbound_stream: InboundStream, ctx: ReaderContext<PR>)
where
    PR: RequestProcessor + Sync + 'static,
{
    loop {
        let frame = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            frame = inbound_stream.next() => frame,
        };
        match frame {
            Some(Ok(command)) if command.is_response_type() => {
                ctx.response_table.complete(command);
            }
            Some(Ok(command)) => process_request(&ctx, command),
            Some(Err(e)) => {
                warn!("Closing connection to {} after read error: {}", ctx.addr, e);
                break;
            }
            None => {
                info!("Connection to {} closed by peer", ctx.addr);
                break;
            }
        }
    }

    ctx.cancel.cancel();
    ctx.connection_tables
        .remove_if(&ctx.addr, |_, client| client.connection_id == ctx.connection_id);
    let failed = ctx.response_table.fail_connection(&ctx.connection_id);
    if failed > 0 {
        warn!("{} pending request(s) to {} failed on connection close", failed, ctx.addr);
    }
}

fn process_request<PR>(ctx: &ReaderContext<PR>, request: RemotingCommand)
where
    PR: RequestProcessor + Sync + 'static,
{
    let processor = ctx.processor.clone();
    let tx = ctx.tx.clone();
    let addr = ctx.addr.clone();
    tokio::spawn(async move {
        let opaque = request.opaque();
        let oneway = request.is_oneway_rpc();
        let code = request.code();
        let response = match processor.process_request(&addr, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Processing request code {} from {} failed: {}", code, addr, e);
                Some(RemotingCommand::create_response_command_with_code_remark(
                    RemotingSysResponseCode::SystemError,
                    e.to_string(),
                ))
            }
        };
        if oneway {
            return;
        }
        if let Some(response) = response {
            let response = response.set_opaque(opaque).mark_response_type();
            if tx.send(response).await.is_err() {
                debug!("Connection to {} closed before response to opaque {} was written", addr, opaque);
            }
        }
    });
}
