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


use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cheetah_string::CheetahString;
use futures::SinkExt;
use futures::StreamExt;
use rocketmq_client_runtime::base::client_config::ClientConfig;
use rocketmq_client_runtime::factory::mq_client_instance::MQClientInstance;
use rocketmq_client_runtime::factory::mq_client_instance::UNKNOWN_OFFSET;
use rocketmq_common::common::constant::PermName;
use rocketmq_common::common::message::message_queue::MessageQueue;
use rocketmq_error::RocketMQError;
use rocketmq_remoting::code::request_code::RequestCode;
use rocketmq_remoting::code::response_code::ResponseCode;
use rocketmq_remoting::connection::Connection;
use rocketmq_remoting::protocol::header::notify_consumer_ids_changed_request_header::NotifyConsumerIdsChangedRequestHeader;
use rocketmq_remoting::protocol::header::query_offset_response_header::QueryOffsetResponseHeader;
use rocketmq_remoting::protocol::remoting_command::RemotingCommand;
use rocketmq_remoting::protocol::route::route_data_view::BrokerData;
use rocketmq_remoting::protocol::route::route_data_view::QueueData;
use rocketmq_remoting::protocol::route::topic_route_data::TopicRouteData;
use rocketmq_remoting::runtime::config::client_config::TokioClientConfig;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Loopback peer: every inbound command is handed to `handler` with a sender for replies.
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
                    if command.is_response_type() {
                        continue;
                    }
                    tokio::spawn(handler(command, tx.clone()));
                }
            });
        }
    });
    addr
}

/// Serves `GetRouteinfoByTopic` from a fixed table; unknown topics get `TopicNotExist`.
async fn start_name_server(routes: Vec<(&'static str, TopicRouteData)>) -> SocketAddr {
    let routes: Arc<HashMap<&'static str, TopicRouteData>> = Arc::new(routes.into_iter().collect());
    start_server(move |request, tx| {
        let routes = routes.clone();
        async move {
            let topic = request
                .ext_fields()
                .and_then(|fields| fields.get("topic"))
                .map(|topic| topic.to_string())
                .unwrap_or_default();
            let response = match routes.get(topic.as_str()) {
                Some(route) => RemotingCommand::create_response_command().set_body(route.encode().unwrap()),
                None => RemotingCommand::create_response_command_with_code_remark(
                    ResponseCode::TopicNotExist,
                    format!("No topic route info in name server for the topic: {topic}"),
                ),
            };
            let _ = tx.send(response.set_opaque(request.opaque())).await;
        }
    })
    .await
}

struct FakeBroker {
    addr: CheetahString,
    heartbeats: Arc<AtomicUsize>,
}

/// Answers heartbeats and offset queries. `max_offset` of `None` makes offset queries fail.
async fn start_broker(max_offset: Option<i64>) -> FakeBroker {
    let heartbeats = Arc::new(AtomicUsize::new(0));
    let counter = heartbeats.clone();
    let addr = start_server(move |request, tx| {
        let counter = counter.clone();
        async move {
            let response = match (RequestCode::from(request.code()), max_offset) {
                (RequestCode::HeartBeat, _) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    RemotingCommand::create_response_command()
                }
                (RequestCode::GetMaxOffset, Some(offset)) => RemotingCommand::create_response_command()
                    .set_command_custom_header(QueryOffsetResponseHeader { offset }),
                (RequestCode::SearchOffsetByTimestamp, Some(_)) => {
                    let timestamp: i64 = request
                        .ext_fields()
                        .and_then(|fields| fields.get("timestamp"))
                        .and_then(|timestamp| timestamp.as_str().parse().ok())
                        .unwrap_or_default();
                    RemotingCommand::create_response_command()
                        .set_command_custom_header(QueryOffsetResponseHeader { offset: timestamp / 1000 })
                }
                _ => RemotingCommand::create_response_command_with_code_remark(
                    ResponseCode::SystemError,
                    "store not ready",
                ),
            };
            let _ = tx.send(response.set_opaque(request.opaque())).await;
        }
    })
    .await;
    FakeBroker {
        addr: CheetahString::from_string(addr.to_string()),
        heartbeats,
    }
}

async fn dead_addr() -> CheetahString {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    CheetahString::from_string(addr.to_string())
}

fn route(queue_nums: u32, brokers: &[(&str, CheetahString)]) -> TopicRouteData {
    let mut route = TopicRouteData::new();
    for (broker_name, addr) in brokers {
        route.queue_datas.push(QueueData::new(
            CheetahString::from(*broker_name),
            queue_nums,
            queue_nums,
            PermName::PERM_READ | PermName::PERM_WRITE,
            0,
        ));
        route.broker_datas.push(BrokerData::new(
            CheetahString::from_static_str("DefaultCluster"),
            CheetahString::from(*broker_name),
            HashMap::from([(0, addr.clone())]),
        ));
    }
    route
}

fn new_instance(namesrv: SocketAddr, default_topic_queue_nums: u32) -> MQClientInstance {
    let mut config = ClientConfig::new();
    config.set_namesrv_addr(namesrv.to_string());
    config.client_ip = Some(CheetahString::from_static_str("127.0.0.1"));
    config.default_topic_queue_nums = default_topic_queue_nums;
    MQClientInstance::new(config)
}

fn topic(name: &'static str) -> CheetahString {
    CheetahString::from_static_str(name)
}

#[tokio::test]
async fn heartbeat_reaches_live_masters_when_one_is_down() {
    let broker_a = start_broker(Some(0)).await;
    let broker_b = start_broker(Some(0)).await;
    let dead = dead_addr().await;
    let namesrv = start_name_server(vec![(
        "TopicTest",
        route(
            4,
            &[
                ("broker-a", broker_a.addr.clone()),
                ("broker-b", broker_b.addr.clone()),
                ("broker-c", dead.clone()),
            ],
        ),
    )])
    .await;
    let instance = new_instance(namesrv, 4);
    assert!(instance.update_topic_route_info(&topic("TopicTest")).await.unwrap());
    assert!(instance.register_producer("producer-group"));

    let summary = instance
        .send_heartbeat_to_all_broker(&instance.prepare_heartbeat_data())
        .await
        .unwrap();

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, dead);
    assert_eq!(broker_a.heartbeats.load(Ordering::SeqCst), 1);
    assert_eq!(broker_b.heartbeats.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_topic_uses_default_topic_route_clamped_to_queue_nums() {
    let broker = start_broker(Some(0)).await;
    let namesrv = start_name_server(vec![("TBW102", route(8, &[("broker-a", broker.addr.clone())]))]).await;
    let instance = new_instance(namesrv, 4);

    let publish_info = instance.resolve_publish_info(&topic("NewTopic")).await.unwrap();

    assert!(publish_info.ok());
    assert_eq!(publish_info.message_queue_list.len(), 4);
    assert!(publish_info
        .message_queue_list
        .iter()
        .all(|mq| mq.get_topic().as_str() == "NewTopic" && mq.get_broker_name().as_str() == "broker-a"));

    let cached = instance.resolve_publish_info(&topic("NewTopic")).await.unwrap();
    assert!(Arc::ptr_eq(&publish_info, &cached));
}

#[tokio::test]
async fn unknown_topic_without_default_route_is_route_not_found() {
    let namesrv = start_name_server(Vec::new()).await;
    let instance = new_instance(namesrv, 4);

    let err = instance.resolve_publish_info(&topic("NewTopic")).await.unwrap_err();

    assert!(matches!(err, RocketMQError::RouteNotFound { .. }));
    assert!(instance.publish_topic_list().is_empty());
}

#[tokio::test]
async fn offsets_are_read_from_the_master_of_the_queue() {
    let broker = start_broker(Some(1024)).await;
    let namesrv = start_name_server(vec![("TopicTest", route(4, &[("broker-a", broker.addr.clone())]))]).await;
    let instance = new_instance(namesrv, 4);
    let mq = MessageQueue::from_parts("TopicTest", "broker-a", 1);

    assert_eq!(instance.get_max_offset(&mq).await, 1024);
    assert_eq!(instance.search_offset(&mq, 1_700_000_000_000).await, 1_700_000_000);
}

#[tokio::test]
async fn failed_offset_queries_return_minus_one() {
    let broker = start_broker(None).await;
    let namesrv = start_name_server(vec![("TopicTest", route(4, &[("broker-a", broker.addr.clone())]))]).await;
    let instance = new_instance(namesrv, 4);

    let served = MessageQueue::from_parts("TopicTest", "broker-a", 0);
    assert_eq!(instance.get_max_offset(&served).await, UNKNOWN_OFFSET);
    assert_eq!(instance.search_offset(&served, 0).await, UNKNOWN_OFFSET);

    let unknown = MessageQueue::from_parts("OtherTopic", "broker-z", 0);
    assert_eq!(instance.get_max_offset(&unknown).await, UNKNOWN_OFFSET);
}

#[tokio::test]
async fn consumer_ids_changed_reaches_rebalance_hook() {
    let (notified_tx, mut notified_rx) = mpsc::unbounded_channel::<CheetahString>();
    let broker_addr = start_server(|request, tx| async move {
        if RequestCode::from(request.code()) != RequestCode::HeartBeat {
            return;
        }
        let _ = tx
            .send(RemotingCommand::create_response_command().set_opaque(request.opaque()))
            .await;
        let notify = RemotingCommand::create_request_command(
            RequestCode::NotifyConsumerIdsChanged,
            NotifyConsumerIdsChangedRequestHeader {
                consumer_group: CheetahString::from_static_str("consumer-group"),
            },
        )
        .mark_oneway_rpc();
        let _ = tx.send(notify).await;
    })
    .await;
    let broker_addr = CheetahString::from_string(broker_addr.to_string());
    let namesrv = start_name_server(vec![("TopicTest", route(4, &[("broker-a", broker_addr)]))]).await;
    let instance = new_instance(namesrv, 4);
    instance.set_rebalance_hook(Arc::new(move |group: &CheetahString| {
        let _ = notified_tx.send(group.clone());
    }));
    instance.update_topic_route_info(&topic("TopicTest")).await.unwrap();
    instance.register_producer("producer-group");

    let summary = instance
        .send_heartbeat_to_all_broker(&instance.prepare_heartbeat_data())
        .await
        .unwrap();
    assert_eq!(summary.succeeded.len(), 1);

    let group = tokio::time::timeout(Duration::from_secs(3), notified_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.as_str(), "consumer-group");
}

#[tokio::test]
async fn started_instance_refreshes_routes_in_the_background() {
    let broker = start_broker(Some(0)).await;
    let namesrv = start_name_server(vec![("TopicTest", route(2, &[("broker-a", broker.addr.clone())]))]).await;
    let instance = Arc::new(new_instance(namesrv, 4));
    instance.route_manager().apply_route_data(&topic("TopicTest"), TopicRouteData::new());

    instance.start().unwrap();
    let mut refreshed = false;
    for _ in 0..50 {
        if instance
            .topic_subscribe_info(&topic("TopicTest"))
            .is_some_and(|queues| queues.len() == 2)
        {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    instance.shutdown().await;

    assert!(refreshed);
}

#[tokio::test]
async fn heartbeat_reaches_live_masters_when_one_never_answers() {
    let broker_a = start_broker(Some(0)).await;
    let broker_b = start_broker(Some(0)).await;
    let hung = start_server(|_request, _tx| async move {}).await;
    let hung = CheetahString::from_string(hung.to_string());
    let namesrv = start_name_server(vec![(
        "TopicTest",
        route(
            4,
            &[
                ("broker-a", broker_a.addr.clone()),
                ("broker-b", broker_b.addr.clone()),
                ("broker-c", hung.clone()),
            ],
        ),
    )])
    .await;
    let mut config = ClientConfig::new();
    config.set_namesrv_addr(namesrv.to_string());
    config.client_ip = Some(CheetahString::from_static_str("127.0.0.1"));
    config.heartbeat_timeout = 500;
    let instance = MQClientInstance::new(config);
    instance.update_topic_route_info(&topic("TopicTest")).await.unwrap();
    instance.register_producer("producer-group");

    let started = tokio::time::Instant::now();
    let summary = instance
        .send_heartbeat_to_all_broker(&instance.prepare_heartbeat_data())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(summary.succeeded.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, hung);
    assert_eq!(broker_a.heartbeats.load(Ordering::SeqCst), 1);
    assert_eq!(broker_b.heartbeats.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn offsets_of_a_new_topic_follow_the_default_topic_route() {
    let broker = start_broker(Some(77)).await;
    let namesrv = start_name_server(vec![("TBW102", route(8, &[("broker-a", broker.addr.clone())]))]).await;
    let instance = new_instance(namesrv, 4);
    let mq = MessageQueue::from_parts("NewTopic", "broker-a", 0);

    assert_eq!(instance.get_max_offset(&mq).await, 77);
    assert!(instance.resolve_broker_address(&topic("broker-a"), 0, true).is_some());
}
