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


//! Benchmarks for RemotingCommand framing.

use std::collections::HashMap;

use bytes::Bytes;
use bytes::BytesMut;
use cheetah_string::CheetahString;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BatchSize;
use criterion::Criterion;
use rocketmq_remoting::code::request_code::RequestCode;
use rocketmq_remoting::protocol::header::client_request_header::GetRouteInfoRequestHeader;
use rocketmq_remoting::protocol::remoting_command::RemotingCommand;

fn route_request() -> RemotingCommand {
    RemotingCommand::create_request_command(RequestCode::GetRouteinfoByTopic, GetRouteInfoRequestHeader::new("TopicTest"))
}

/// A heartbeat-sized command: a few ext fields and a 1KB body.
fn heartbeat_request() -> RemotingCommand {
    let mut ext_fields = HashMap::new();
    for i in 0..8 {
        ext_fields.insert(
            CheetahString::from(format!("field_{i}")),
            CheetahString::from(format!("value_for_field_{i}")),
        );
    }
    RemotingCommand::create_remoting_command(RequestCode::HeartBeat)
        .set_remark("heartbeat")
        .set_ext_fields(ext_fields)
        .set_body(Bytes::from(vec![0u8; 1024]))
}

fn encoded(command: &RemotingCommand) -> Bytes {
    let mut dst = BytesMut::new();
    command.encode(&mut dst).unwrap();
    dst.freeze()
}

fn bench_encode(c: &mut Criterion) {
    let route = route_request();
    let heartbeat = heartbeat_request();
    c.bench_function("encode_route_request", |b| {
        b.iter(|| {
            let mut dst = BytesMut::new();
            route.encode(&mut dst).unwrap();
            dst
        })
    });
    c.bench_function("encode_heartbeat_request", |b| {
        b.iter(|| {
            let mut dst = BytesMut::new();
            heartbeat.encode(&mut dst).unwrap();
            dst
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let route = encoded(&route_request());
    let heartbeat = encoded(&heartbeat_request());
    c.bench_function("decode_route_request", |b| {
        b.iter_batched(
            || BytesMut::from(&route[..]),
            |mut src| RemotingCommand::decode(&mut src).unwrap(),
            BatchSize::SmallInput,
        )
    });
    c.bench_function("decode_heartbeat_request", |b| {
        b.iter_batched(
            || BytesMut::from(&heartbeat[..]),
            |mut src| RemotingCommand::decode(&mut src).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
