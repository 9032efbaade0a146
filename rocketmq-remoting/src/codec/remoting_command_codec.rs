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

use bytes::BytesMut;
use rocketmq_error::RocketMQError;
use rocketmq_error::SerializationError;
use tokio_util::codec::Decoder;
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::remoting_command::RemotingCommand;

/// Default upper bound of a single frame, matching the broker's 16 MiB limit.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Frames [`RemotingCommand`]s as `[total length][serialize type | header length][header][body]`.
///
/// A frame that is well delimited but carries an undecodable header is logged and
/// skipped, so one bad frame does not tear down the connection. Length words that
/// cannot be trusted (negative, oversized, or inconsistent) are returned as errors,
/// since the stream can no longer be re-synchronised.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RemotingCommandCodec {
    max_frame_length: usize,
}

impl Default for RemotingCommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl RemotingCommandCodec {
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        RemotingCommandCodec { max_frame_length }
    }

    fn check_frame_length(&self, src: &BytesMut) -> Result<(), RocketMQError> {
        if src.len() < 4 {
            return Ok(());
        }
        let total_size = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if total_size >= 0 && total_size as usize > self.max_frame_length {
            return Err(SerializationError::invalid_frame(format!(
                "frame length {total_size} exceeds the limit of {}",
                self.max_frame_length
            ))
            .into());
        }
        Ok(())
    }
}

/// Errors that only spoil the frame they came from.
fn is_frame_local(error: &RocketMQError) -> bool {
    matches!(
        error,
        RocketMQError::Serialization(
            SerializationError::DecodeFailed { .. } | SerializationError::UnsupportedSerializeType(_)
        )
    )
}

impl Decoder for RemotingCommandCodec {
    type Error = RocketMQError;
    type Item = RemotingCommand;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            self.check_frame_length(src)?;
            match RemotingCommand::decode(src) {
                Ok(cmd) => return Ok(cmd),
                Err(error) if is_frame_local(&error) => {
                    warn!("Discarding undecodable frame: {}", error);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl Encoder<RemotingCommand> for RemotingCommandCodec {
    type Error = RocketMQError;

    fn encode(&mut self, item: RemotingCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;
    use bytes::Bytes;

    use super::*;
    use crate::protocol::header::client_request_header::GetRouteInfoRequestHeader;

    #[test]
    fn decode_handles_insufficient_data() {
        let mut decoder = RemotingCommandCodec::new();
        let mut src = BytesMut::from(&[0, 0, 0, 1][..]);
        assert!(matches!(decoder.decode(&mut src), Ok(None)));
    }

    #[test]
    fn decode_handles_invalid_total_size() {
        let mut decoder = RemotingCommandCodec::new();
        // total_size = 1, which cannot even hold the header-length word
        let mut src = BytesMut::from(&[0, 0, 0, 1, 0, 0, 0, 0][..]);
        assert!(decoder.decode(&mut src).is_err());
    }

    #[test]
    fn decode_rejects_oversized_frame_before_buffering_it() {
        let mut decoder = RemotingCommandCodec::with_max_frame_length(64);
        let mut src = BytesMut::new();
        src.put_i32(65);
        assert!(decoder.decode(&mut src).is_err());
    }

    #[test]
    fn encode_then_decode_through_the_codec() {
        let mut codec = RemotingCommandCodec::new();
        let mut buf = BytesMut::new();
        let command = RemotingCommand::create_request_command(105, GetRouteInfoRequestHeader::new("TopicTest"))
            .set_body(Bytes::from_static(b"body"))
            .set_remark("remark");
        let opaque = command.opaque();
        codec.encode(command, &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.opaque(), opaque);
        assert_eq!(decoded.remark().unwrap().as_str(), "remark");
        assert_eq!(decoded.body().unwrap().as_ref(), b"body");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn bad_header_is_skipped_and_next_frame_decoded() {
        let mut codec = RemotingCommandCodec::new();
        let mut buf = BytesMut::new();
        let junk = b"<<not json>>";
        buf.put_i32(4 + junk.len() as i32);
        buf.put_i32(junk.len() as i32);
        buf.put_slice(junk);
        codec.encode(RemotingCommand::create_remoting_command(34), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.code(), 34);
    }

    #[test]
    fn bad_header_followed_by_partial_frame_waits() {
        let mut codec = RemotingCommandCodec::new();
        let mut buf = BytesMut::new();
        buf.put_i32(6);
        buf.put_i32(2);
        buf.put_slice(b"{]");
        buf.put_i32(100);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4);
    }
}
