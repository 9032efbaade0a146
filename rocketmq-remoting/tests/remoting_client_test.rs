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

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use futures::SinkExt;
use futures::StreamExt;
use rocketmq_error::RocketMQResult;
use rocketmq_remoting::clients::RocketmqDefaultClient;
use rocketmq_remoting::code::request_code::RequestCode;
use rocketmq_remoting::connection::Connection;
use rocketmq_remoting::protocol::remoting_command::RemotingCommand;
use rocketmq_remoting::request_processor::default_request_processor::DefaultRemotingRequestProcessor;
use rocketmq_remoting::runtime::config::client_config::TokioClientConfig;
use rocketmq_remoting::runtime::processor::RequestProcessor;
use tokio::net::TcpListener;
use tokio::net::TcpSocket;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

/// Loopback peer: every request is handed to `handler` together with a sender
/// for anything the peer wants to write back.
async fn start_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(RemotingCommand, mpsc::Sender<RemotingCommand>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let handler = handler.clone();
            tokio::spawn(async move {
                let connection = Connection::new(stream, &TokioClientConfig::default()).unwrap();
                let (mut sink, mut stream) = connection.into_split();
                let (tx, mut rx) = mpsc::channel::<RemotingCommand>(64);
                tokio::spawn(async move {
                    while let Some(command) = rx.recv().await {
                        if sink.send(command).await.is_err() {
                            break;
                        }
                    }
                });
                while let Some(Ok(command)) = stream.next().await {
                    tokio::spawn(handler(command, tx.clone()));
                }
            });
        }
    });
    addr
}

fn new_client() -> RocketmqDefaultClient {
    RocketmqDefaultClient::new(Arc::new(TokioClientConfig::default()), DefaultRemotingRequestProcessor)
}

fn addr_of(addr: SocketAddr) -> CheetahString {
    CheetahString::from_string(addr.to_string())
}

async fn dead_addr() -> CheetahString {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr_of(addr)
}

fn echo(request: &RemotingCommand) -> RemotingCommand {
    RemotingCommand::create_response_command()
        .set_opaque(request.opaque())
        .set_remark(request.code().to_string())
}

#[tokio::test]
async fn invoke_sync_returns_matching_response() {
    let addr = start_server(|request, tx| async move {
        tx.send(echo(&request)).await.unwrap();
    })
    .await;
    let client = new_client();

    let response = client
        .invoke_sync(
            Some(&addr_of(addr)),
            RemotingCommand::create_remoting_command(RequestCode::HeartBeat),
            3000,
        )
        .await
        .unwrap();

    assert!(response.is_response_type());
    assert_eq!(response.remark().unwrap().as_str(), "34");
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn responses_arriving_out_of_order_reach_their_callers() {
    let addr = start_server(|request, tx| async move {
        let delay: u64 = request
            .ext_fields()
            .and_then(|fields| fields.get("delay"))
            .and_then(|delay| delay.as_str().parse().ok())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        tx.send(echo(&request)).await.unwrap();
    })
    .await;
    let client = Arc::new(new_client());
    let target = addr_of(addr);

    let mut calls = Vec::new();
    for (code, delay) in [(101, "300"), (102, "150"), (103, "0")] {
        let client = client.clone();
        let target = target.clone();
        calls.push(tokio::spawn(async move {
            let mut request = RemotingCommand::create_remoting_command(code);
            request.add_ext_field("delay", delay);
            client.invoke_sync(Some(&target), request, 3000).await
        }));
    }

    for (call, code) in calls.into_iter().zip(["101", "102", "103"]) {
        let response = call.await.unwrap().unwrap();
        assert_eq!(response.remark().unwrap().as_str(), code);
    }
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn silent_peer_yields_timeout_and_cleans_the_table() {
    let addr = start_server(|_request, _tx| async move {}).await;
    let client = new_client();

    let err = client
        .invoke_sync(
            Some(&addr_of(addr)),
            RemotingCommand::create_remoting_command(RequestCode::GetMaxOffset),
            200,
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn async_callback_runs_once_on_timeout() {
    let addr = start_server(|_request, _tx| async move {}).await;
    let client = new_client();
    let calls = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = oneshot::channel();

    let counter = calls.clone();
    client
        .invoke_async(
            Some(&addr_of(addr)),
            RemotingCommand::create_remoting_command(RequestCode::GetMaxOffset),
            100,
            move |result: RocketMQResult<RemotingCommand>| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = done_tx.send(result.unwrap_err().is_timeout());
            },
        )
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.scan_response_table();
    assert!(done_rx.await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.scan_response_table(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn async_callback_receives_connect_failure() {
    let client = new_client();
    let (done_tx, done_rx) = oneshot::channel();
    client
        .invoke_async(
            Some(&dead_addr().await),
            RemotingCommand::create_remoting_command(RequestCode::HeartBeat),
            1000,
            move |result: RocketMQResult<RemotingCommand>| {
                let _ = done_tx.send(result);
            },
        )
        .await;

    assert!(done_rx.await.unwrap().unwrap_err().is_connection_error());
}

#[tokio::test]
async fn closed_connection_fails_pending_invocations() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = addr_of(listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut connection = Connection::new(stream, &TokioClientConfig::default()).unwrap();
        let _ = connection.receive_command().await;
        drop(connection);
    });
    let client = new_client();

    let started = tokio::time::Instant::now();
    let err = client
        .invoke_sync(
            Some(&addr),
            RemotingCommand::create_remoting_command(RequestCode::HeartBeat),
            10_000,
        )
        .await
        .unwrap_err();

    assert!(err.is_connection_error(), "unexpected error: {err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(client.pending_requests(), 0);
    assert!(!client.is_connected(&addr));
}

#[tokio::test]
async fn oneway_requests_register_nothing() {
    let (seen_tx, mut seen_rx) = mpsc::channel(1);
    let addr = start_server(move |request, _tx| {
        let seen_tx = seen_tx.clone();
        async move {
            seen_tx.send(request).await.unwrap();
        }
    })
    .await;
    let client = new_client();

    client
        .invoke_oneway(
            Some(&addr_of(addr)),
            RemotingCommand::create_remoting_command(RequestCode::UnregisterClient),
        )
        .await
        .unwrap();

    let seen = seen_rx.recv().await.unwrap();
    assert!(seen.is_oneway_rpc());
    assert_eq!(seen.code(), 35);
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn name_server_selection_skips_unreachable_addresses() {
    let live = start_server(|request, tx| async move {
        tx.send(echo(&request)).await.unwrap();
    })
    .await;
    let client = new_client();
    client.update_name_server_address_list(vec![dead_addr().await, addr_of(live)]);

    let response = client
        .invoke_sync(
            None,
            RemotingCommand::create_remoting_command(RequestCode::GetRouteinfoByTopic),
            3000,
        )
        .await
        .unwrap();
    assert_eq!(response.remark().unwrap().as_str(), "105");
    assert!(client.is_connected(&addr_of(live)));
}

#[tokio::test]
async fn empty_name_server_list_is_an_error() {
    let client = new_client();
    let err = client
        .invoke_sync(
            None,
            RemotingCommand::create_remoting_command(RequestCode::GetRouteinfoByTopic),
            1000,
        )
        .await
        .unwrap_err();
    assert!(!err.is_timeout());
}

struct Acknowledge;

impl RequestProcessor for Acknowledge {
    async fn process_request(
        &self,
        _remote_addr: &CheetahString,
        request: RemotingCommand,
    ) -> RocketMQResult<Option<RemotingCommand>> {
        Ok(Some(
            RemotingCommand::create_response_command().set_remark(format!("ack {}", request.code())),
        ))
    }
}

#[tokio::test]
async fn peer_initiated_requests_reach_the_processor() {
    let (answer_tx, mut answer_rx) = mpsc::channel(1);
    let addr = start_server(move |command, tx| {
        let answer_tx = answer_tx.clone();
        async move {
            if command.is_response_type() {
                answer_tx.send(command).await.unwrap();
                return;
            }
            let notify = RemotingCommand::create_remoting_command(RequestCode::NotifyConsumerIdsChanged).set_opaque(4242);
            tx.send(notify).await.unwrap();
            tx.send(echo(&command)).await.unwrap();
        }
    })
    .await;
    let client = RocketmqDefaultClient::new(Arc::new(TokioClientConfig::default()), Acknowledge);

    client
        .invoke_sync(
            Some(&addr_of(addr)),
            RemotingCommand::create_remoting_command(RequestCode::HeartBeat),
            3000,
        )
        .await
        .unwrap();

    let answer = tokio::time::timeout(Duration::from_secs(3), answer_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(answer.is_response_type());
    assert_eq!(answer.opaque(), 4242);
    assert_eq!(answer.remark().unwrap().as_str(), "ack 40");
}

#[tokio::test]
async fn shutdown_fails_waiting_callers() {
    let addr = start_server(|_request, _tx| async move {}).await;
    let client = Arc::new(new_client());
    let target = addr_of(addr);

    let waiter = {
        let client = client.clone();
        let target = target.clone();
        tokio::spawn(async move {
            client
                .invoke_sync(
                    Some(&target),
                    RemotingCommand::create_remoting_command(RequestCode::PullMessage),
                    10_000,
                )
                .await
        })
    };
    while client.pending_requests() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    client.shutdown();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(err.is_connection_error());
}

/// Accepts connections and never reads from them.
async fn start_stalled_peer() -> CheetahString {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = addr_of(listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// A listener that never accepts, with its backlog filled so further connects hang.
async fn start_unaccepting_peer() -> (CheetahString, TcpListener, Vec<TcpStream>) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = socket.local_addr().unwrap();
    let listener = socket.listen(1).unwrap();
    let mut filler = Vec::new();
    for _ in 0..8 {
        if let Ok(Ok(stream)) = tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(addr)).await {
            filler.push(stream);
        }
    }
    (addr_of(addr), listener, filler)
}

fn client_with_write_queue(write_queue_capacity: usize) -> RocketmqDefaultClient {
    let config = TokioClientConfig {
        write_queue_capacity,
        ..TokioClientConfig::default()
    };
    RocketmqDefaultClient::new(Arc::new(config), DefaultRemotingRequestProcessor)
}

fn large_request() -> RemotingCommand {
    RemotingCommand::create_remoting_command(RequestCode::HeartBeat).set_body(vec![0u8; 1024 * 1024])
}

#[tokio::test]
async fn stalled_writes_time_out_within_the_invoke_budget() {
    let addr = start_stalled_peer().await;
    let client = Arc::new(client_with_write_queue(1));

    let calls: Vec<_> = (0..32)
        .map(|_| {
            let client = client.clone();
            let addr = addr.clone();
            tokio::spawn(async move {
                let started = tokio::time::Instant::now();
                let result = client.invoke_sync(Some(&addr), large_request(), 300).await;
                (result, started.elapsed())
            })
        })
        .collect();

    for call in calls {
        let (result, elapsed) = call.await.unwrap();
        assert!(result.unwrap_err().is_timeout());
        assert!(elapsed < Duration::from_millis(1300), "took {elapsed:?}");
    }
    client.scan_response_table();
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn oneway_fails_fast_when_the_write_queue_is_full() {
    let addr = start_stalled_peer().await;
    let client = client_with_write_queue(1);

    let started = tokio::time::Instant::now();
    let mut rejected = 0;
    for _ in 0..64 {
        if client.invoke_oneway(Some(&addr), large_request()).await.is_err() {
            rejected += 1;
        }
    }

    assert!(rejected > 0);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn hanging_connect_does_not_hold_up_other_addresses() {
    let (hung, _listener, _filler) = start_unaccepting_peer().await;
    let live = start_server(|request, tx| async move {
        tx.send(echo(&request)).await.unwrap();
    })
    .await;
    let config = TokioClientConfig {
        connect_timeout_millis: 10_000,
        ..TokioClientConfig::default()
    };
    let client = Arc::new(RocketmqDefaultClient::new(
        Arc::new(config),
        DefaultRemotingRequestProcessor,
    ));

    let hung_call = {
        let client = client.clone();
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let result = client
                .invoke_sync(
                    Some(&hung),
                    RemotingCommand::create_remoting_command(RequestCode::HeartBeat),
                    300,
                )
                .await;
            (result, started.elapsed())
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let response = client
        .invoke_sync(
            Some(&addr_of(live)),
            RemotingCommand::create_remoting_command(RequestCode::HeartBeat),
            1000,
        )
        .await
        .unwrap();
    assert_eq!(response.remark().unwrap().as_str(), "34");

    let (result, elapsed) = hung_call.await.unwrap();
    assert!(result.is_err());
    assert!(elapsed < Duration::from_millis(1300), "took {elapsed:?}");
    assert_eq!(client.pending_requests(), 0);
}
