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

use std::net::SocketAddr;

use cheetah_string::CheetahString;
use futures::stream::SplitSink;
use futures::stream::SplitStream;
use futures::SinkExt;
use futures::StreamExt;
use rocketmq_error::RocketMQResult;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::remoting_command_codec::RemotingCommandCodec;
use crate::protocol::remoting_command::RemotingCommand;
use crate::runtime::config::client_config::TokioClientConfig;

pub type ConnectionId = CheetahString;

pub type OutboundSink = SplitSink<Framed<TcpStream, RemotingCommandCodec>, RemotingCommand>;
pub type InboundStream = SplitStream<Framed<TcpStream, RemotingCommandCodec>>;

/// A TCP stream framed with [`RemotingCommandCodec`].
///
/// Each connection gets a fresh uuid so that pending invocations can be failed
/// precisely when it goes away, even if a new connection to the same address
/// has already replaced it.
pub struct Connection {
    outbound_sink: OutboundSink,
    inbound_stream: InboundStream,
    connection_id: ConnectionId,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
}

impl Connection {
    pub fn new(tcp_stream: TcpStream, config: &TokioClientConfig) -> RocketMQResult<Connection> {
        let local_addr = tcp_stream.local_addr()?;
        let remote_addr = tcp_stream.peer_addr()?;
        tcp_stream.set_nodelay(true)?;
        let framed = Framed::with_capacity(
            tcp_stream,
            RemotingCommandCodec::with_max_frame_length(config.max_frame_length),
            config.read_buffer_capacity,
        );
        let (outbound_sink, inbound_stream) = framed.split();
        Ok(Self {
            outbound_sink,
            inbound_stream,
            connection_id: CheetahString::from_string(Uuid::new_v4().to_string()),
            local_addr,
            remote_addr,
        })
    }

    #[inline]
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Next decoded command; `None` once the peer has closed the stream.
    pub async fn receive_command(&mut self) -> Option<RocketMQResult<RemotingCommand>> {
        self.inbound_stream.next().await
    }

    pub async fn send_command(&mut self, command: RemotingCommand) -> RocketMQResult<()> {
        self.outbound_sink.send(command).await
    }

    /// Separates the halves so reading and writing can run in their own tasks.
    pub fn into_split(self) -> (OutboundSink, InboundStream) {
        (self.outbound_sink, self.inbound_stream)
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::code::request_code::RequestCode;

    #[tokio::test]
    async fn commands_cross_a_loopback_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = TokioClientConfig::default();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, &TokioClientConfig::default()).unwrap();
            let request = conn.receive_command().await.unwrap().unwrap();
            let response = RemotingCommand::create_response_command().set_opaque(request.opaque());
            conn.send_command(response).await.unwrap();
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let mut conn = Connection::new(stream, &config).unwrap();
        assert_eq!(conn.remote_addr(), addr);

        let request = RemotingCommand::create_remoting_command(RequestCode::HeartBeat).set_opaque(99);
        conn.send_command(request).await.unwrap();
        let response = conn.receive_command().await.unwrap().unwrap();
        assert!(response.is_response_type());
        assert_eq!(response.opaque(), 99);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn every_connection_has_its_own_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = TokioClientConfig::default();
        let a = Connection::new(TcpStream::connect(addr).await.unwrap(), &config).unwrap();
        let b = Connection::new(TcpStream::connect(addr).await.unwrap(), &config).unwrap();
        assert_ne!(a.connection_id(), b.connection_id());
    }
}
