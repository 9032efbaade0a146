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
use std::fmt;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use cheetah_string::CheetahString;
use lazy_static::lazy_static;
use rocketmq_common::utils::serde_json_utils::SerdeJsonUtils;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use rocketmq_error::SerializationError;
use serde::Deserialize;
use serde::Serialize;

use super::RemotingCommandType;
use super::SerializeType;
use crate::code::response_code::RemotingSysResponseCode;
use crate::protocol::command_custom_header::CommandCustomHeader;
use crate::protocol::command_custom_header::FromMap;
use crate::protocol::LanguageCode;

pub const REMOTING_VERSION_ENV: &str = "ROCKETMQ_REMOTING_VERSION";

/// The header length occupies the low three bytes of the header-length word.
const HEADER_LENGTH_MASK: i32 = 0x00FF_FFFF;

lazy_static! {
    static ref REQUEST_ID: AtomicI32 = AtomicI32::new(0);
    static ref CONFIG_VERSION: i32 = std::env::var(REMOTING_VERSION_ENV)
        .ok()
        .and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(0);
}

/// The wire envelope shared by requests and responses.
///
/// Every field except `body` travels in the JSON header, so the two ends need not
/// agree on field order and unknown header fields are ignored on decode.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotingCommand {
    code: i32,
    #[serde(default)]
    language: LanguageCode,
    #[serde(default)]
    version: i32,
    #[serde(default)]
    opaque: i32,

    ///flag -> bit: 00
    /// The lowest bit of the flag indicates whether it is a response command.
    /// Non-zero indicates a response command, while 0 indicates a request command.
    /// The second bit indicates whether it is a one-way request.
    /// Non-zero indicates a one-way request.
    #[serde(default)]
    flag: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remark: Option<CheetahString>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    ext_fields: Option<HashMap<CheetahString, CheetahString>>,

    #[serde(skip)]
    body: Option<Bytes>,
    #[serde(rename = "serializeTypeCurrentRPC", default)]
    serialize_type: SerializeType,
}

impl fmt::Debug for RemotingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for RemotingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RemotingCommand [code={}, language={:?}, version={}, opaque={}, flag(B)={:b}, remark={}, \
             extFields={:?}, serializeTypeCurrentRPC={:?}, bodyLength={}]",
            self.code,
            self.language,
            self.version,
            self.opaque,
            self.flag,
            self.remark.as_ref().map(|r| r.as_str()).unwrap_or(""),
            self.ext_fields,
            self.serialize_type,
            self.body.as_ref().map_or(0, |b| b.len())
        )
    }
}

impl Default for RemotingCommand {
    fn default() -> Self {
        RemotingCommand {
            code: 0,
            language: LanguageCode::RUST,
            version: *CONFIG_VERSION,
            opaque: Self::next_opaque(),
            flag: 0,
            remark: None,
            ext_fields: None,
            body: None,
            serialize_type: SerializeType::JSON,
        }
    }
}

impl RemotingCommand {
    pub(crate) const RPC_ONEWAY: i32 = 1;
    pub(crate) const RPC_TYPE: i32 = 0;
}

impl RemotingCommand {
    pub fn create_request_command<T>(code: impl Into<i32>, header: T) -> Self
    where
        T: CommandCustomHeader,
    {
        Self::default().set_code(code).set_command_custom_header(header)
    }

    pub fn create_remoting_command(code: impl Into<i32>) -> Self {
        Self::default().set_code(code)
    }

    pub fn create_response_command_with_code(code: impl Into<i32>) -> Self {
        Self::default().set_code(code).mark_response_type()
    }

    pub fn create_response_command_with_code_remark(code: impl Into<i32>, remark: impl Into<CheetahString>) -> Self {
        Self::default()
            .set_code(code)
            .set_remark(remark)
            .mark_response_type()
    }

    pub fn create_response_command() -> Self {
        Self::default()
            .set_code(RemotingSysResponseCode::Success)
            .mark_response_type()
    }

    /// Hands out a process-wide unique request id.
    pub fn next_opaque() -> i32 {
        REQUEST_ID.fetch_add(1, Ordering::AcqRel)
    }

    /// Merges the header's fields into `extFields`, overwriting keys already present.
    pub fn set_command_custom_header<T>(mut self, header: T) -> Self
    where
        T: CommandCustomHeader,
    {
        if let Some(map) = header.to_map() {
            self.ext_fields.get_or_insert_with(HashMap::new).extend(map);
        }
        self
    }

    pub fn set_code(mut self, code: impl Into<i32>) -> Self {
        self.code = code.into();
        self
    }

    pub fn set_language(mut self, language: LanguageCode) -> Self {
        self.language = language;
        self
    }

    pub fn set_opaque(mut self, opaque: i32) -> Self {
        self.opaque = opaque;
        self
    }

    pub fn set_opaque_mut(&mut self, opaque: i32) {
        self.opaque = opaque;
    }

    pub fn set_flag(mut self, flag: i32) -> Self {
        self.flag = flag;
        self
    }

    pub fn set_remark(mut self, remark: impl Into<CheetahString>) -> Self {
        self.remark = Some(remark.into());
        self
    }

    pub fn set_ext_fields(mut self, ext_fields: HashMap<CheetahString, CheetahString>) -> Self {
        self.ext_fields = Some(ext_fields);
        self
    }

    pub fn add_ext_field(&mut self, key: impl Into<CheetahString>, value: impl Into<CheetahString>) -> &mut Self {
        self.ext_fields
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn set_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn set_body_mut_ref(&mut self, body: Option<impl Into<Bytes>>) {
        self.body = body.map(|b| b.into());
    }

    pub fn mark_response_type(mut self) -> Self {
        let mark = 1 << Self::RPC_TYPE;
        self.flag |= mark;
        self
    }

    pub fn mark_oneway_rpc(mut self) -> Self {
        let mark = 1 << Self::RPC_ONEWAY;
        self.flag |= mark;
        self
    }

    pub fn mark_oneway_rpc_ref(&mut self) {
        self.flag |= 1 << Self::RPC_ONEWAY;
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn opaque(&self) -> i32 {
        self.opaque
    }

    pub fn flag(&self) -> i32 {
        self.flag
    }

    pub fn remark(&self) -> Option<&CheetahString> {
        self.remark.as_ref()
    }

    pub fn ext_fields(&self) -> Option<&HashMap<CheetahString, CheetahString>> {
        self.ext_fields.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    pub fn serialize_type(&self) -> SerializeType {
        self.serialize_type
    }

    pub fn is_response_type(&self) -> bool {
        let bits = 1 << Self::RPC_TYPE;
        (self.flag & bits) == bits
    }

    #[inline]
    pub fn is_oneway_rpc(&self) -> bool {
        let bits = 1 << Self::RPC_ONEWAY;
        (self.flag & bits) == bits
    }

    pub fn get_type(&self) -> RemotingCommandType {
        if self.is_response_type() {
            RemotingCommandType::RESPONSE
        } else {
            RemotingCommandType::REQUEST
        }
    }

    /// Reads a typed header out of `extFields`. A command without `extFields` is
    /// treated as an empty map, so required fields report `MissingField`.
    pub fn decode_command_custom_header<T>(&self) -> RocketMQResult<T>
    where
        T: FromMap<Target = T, Error = RocketMQError>,
    {
        match self.ext_fields {
            Some(ref fields) => T::from(fields),
            None => T::from(&HashMap::new()),
        }
    }

    pub fn mark_serialize_type(header_length: i32, protocol_type: SerializeType) -> i32 {
        ((protocol_type.get_code() as i32) << 24) | (header_length & HEADER_LENGTH_MASK)
    }

    /// Writes `[total length][serialize type | header length][header][body]` to `dst`.
    ///
    /// `total length` counts the header-length word, the header and the body.
    pub fn encode(&self, dst: &mut BytesMut) -> RocketMQResult<()> {
        let header = SerdeJsonUtils::to_json_vec(self)?;
        if header.len() as i32 > HEADER_LENGTH_MASK {
            return Err(SerializationError::encode_failed(
                "json",
                format!("header of {} bytes does not fit the frame", header.len()),
            )
            .into());
        }
        let header_length = header.len() as i32;
        let body_length = self.body.as_ref().map_or(0, |b| b.len()) as i32;
        let total_length = 4 + header_length + body_length;

        dst.reserve((total_length + 4) as usize);
        dst.put_i32(total_length);
        dst.put_i32(Self::mark_serialize_type(header_length, self.serialize_type));
        dst.put_slice(&header);
        if let Some(body) = &self.body {
            dst.put_slice(body);
        }
        Ok(())
    }

    /// Splits one frame off the front of `src`.
    ///
    /// Returns `Ok(None)` until a whole frame is buffered. A frame whose length words are
    /// inconsistent is an `InvalidFrame` error; a frame that is well delimited but whose
    /// header cannot be decoded is consumed and reported as a decode failure, leaving
    /// `src` positioned at the next frame.
    pub fn decode(src: &mut BytesMut) -> RocketMQResult<Option<RemotingCommand>> {
        if src.len() < 4 {
            return Ok(None);
        }
        let total_size = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if total_size < 4 {
            return Err(SerializationError::invalid_frame(format!(
                "frame length {total_size} is smaller than the header-length word"
            ))
            .into());
        }
        let total_size = total_size as usize;
        if src.len() < total_size + 4 {
            src.reserve(total_size + 4 - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total_size + 4);
        frame.advance(4);
        let ori_header_length = frame.get_i32();
        let header_length = (ori_header_length & HEADER_LENGTH_MASK) as usize;
        if header_length > total_size - 4 {
            return Err(SerializationError::invalid_frame(format!(
                "header length {header_length} is greater than frame length {total_size}"
            ))
            .into());
        }
        let type_code = ((ori_header_length >> 24) & 0xFF) as u8;
        if SerializeType::value_of(type_code).is_none() {
            return Err(SerializationError::UnsupportedSerializeType(type_code).into());
        }

        let header = frame.split_to(header_length);
        let body = if frame.is_empty() { None } else { Some(frame.freeze()) };
        Self::decode_parts(&header, body).map(Some)
    }

    /// Rebuilds a command from its JSON header and optional body.
    ///
    /// Bare integer object keys are quoted before decoding; some peers write
    /// `extFields` and broker-id maps that way.
    pub fn decode_parts(header: &[u8], body: Option<Bytes>) -> RocketMQResult<RemotingCommand> {
        let mut cmd: RemotingCommand = SerdeJsonUtils::from_lenient_json_slice(header)?;
        cmd.body = body;
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::request_code::RequestCode;
    use crate::protocol::header::client_request_header::GetRouteInfoRequestHeader;

    #[test]
    fn serializes_header_fields_in_camel_case() {
        let command = RemotingCommand::create_remoting_command(1)
            .set_language(LanguageCode::JAVA)
            .set_opaque(1)
            .set_flag(1)
            .set_ext_fields(HashMap::new())
            .set_remark("remark");

        assert_eq!(
            format!(
                "{{\"code\":1,\"language\":\"JAVA\",\"version\":{},\"opaque\":1,\"flag\":1,\"remark\":\"remark\",\
                 \"extFields\":{{}},\"serializeTypeCurrentRPC\":\"JSON\"}}",
                *CONFIG_VERSION
            ),
            serde_json::to_string(&command).unwrap()
        );
    }

    #[test]
    fn mark_serialize_type_keeps_low_three_bytes() {
        assert_eq!(RemotingCommand::mark_serialize_type(261, SerializeType::JSON), 261);
        assert_eq!(RemotingCommand::mark_serialize_type(16777215, SerializeType::JSON), 16777215);
    }

    #[test]
    fn opaque_ids_are_unique() {
        let a = RemotingCommand::default().opaque();
        let b = RemotingCommand::default().opaque();
        assert_ne!(a, b);
    }

    #[test]
    fn flag_bits_mark_response_and_oneway() {
        let request = RemotingCommand::create_remoting_command(RequestCode::HeartBeat);
        assert_eq!(request.get_type(), RemotingCommandType::REQUEST);
        assert!(!request.is_oneway_rpc());

        let oneway = request.mark_oneway_rpc();
        assert!(oneway.is_oneway_rpc());
        assert!(!oneway.is_response_type());

        let response = RemotingCommand::create_response_command();
        assert!(response.is_response_type());
        assert_eq!(response.code(), 0);
    }

    #[test]
    fn encoded_frame_layout() {
        let command = RemotingCommand::create_request_command(
            RequestCode::GetRouteinfoByTopic,
            GetRouteInfoRequestHeader::new("TopicTest"),
        )
        .set_body(Bytes::from_static(b"abc"));
        let mut dst = BytesMut::new();
        command.encode(&mut dst).unwrap();

        let total = i32::from_be_bytes([dst[0], dst[1], dst[2], dst[3]]) as usize;
        let header_word = i32::from_be_bytes([dst[4], dst[5], dst[6], dst[7]]);
        assert_eq!(total + 4, dst.len());
        assert_eq!(header_word >> 24, 0);
        let header_length = (header_word & HEADER_LENGTH_MASK) as usize;
        assert_eq!(total, 4 + header_length + 3);
        assert_eq!(&dst[8 + header_length..], b"abc");
    }

    #[test]
    fn decode_recovers_encoded_command() {
        let command = RemotingCommand::create_request_command(
            RequestCode::GetRouteinfoByTopic,
            GetRouteInfoRequestHeader::new("TopicTest"),
        )
        .set_body(Bytes::from_static(b"payload"));
        let mut buf = BytesMut::new();
        command.encode(&mut buf).unwrap();

        let decoded = RemotingCommand::decode(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty());
        assert_eq!(decoded.code(), 105);
        assert_eq!(decoded.opaque(), command.opaque());
        assert_eq!(decoded.body().unwrap().as_ref(), b"payload");
        let header: GetRouteInfoRequestHeader = decoded.decode_command_custom_header().unwrap();
        assert_eq!(header.topic.as_str(), "TopicTest");
    }

    #[test]
    fn decode_waits_for_whole_frame() {
        let mut buf = BytesMut::new();
        RemotingCommand::create_remoting_command(34).encode(&mut buf).unwrap();
        let full_len = buf.len();
        let mut partial = buf.split_to(full_len - 1);
        assert!(RemotingCommand::decode(&mut partial).unwrap().is_none());
        assert_eq!(partial.len(), full_len - 1);
    }

    #[test]
    fn decode_rejects_header_longer_than_frame() {
        let mut buf = BytesMut::new();
        buf.put_i32(8);
        buf.put_i32(100);
        buf.put_i32(0);
        let err = RemotingCommand::decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            RocketMQError::Serialization(SerializationError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn decode_rejects_unknown_serialize_type() {
        let mut buf = BytesMut::new();
        buf.put_i32(4);
        buf.put_i32(RemotingCommand::mark_serialize_type(0, SerializeType::JSON) | (1 << 24));
        let err = RemotingCommand::decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            RocketMQError::Serialization(SerializationError::UnsupportedSerializeType(1))
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn malformed_header_consumes_only_its_frame() {
        let bad = b"{not json";
        let mut buf = BytesMut::new();
        buf.put_i32(4 + bad.len() as i32);
        buf.put_i32(bad.len() as i32);
        buf.put_slice(bad);
        RemotingCommand::create_remoting_command(34).encode(&mut buf).unwrap();

        assert!(RemotingCommand::decode(&mut buf).unwrap_err().is_decode_error());
        let next = RemotingCommand::decode(&mut buf).unwrap().unwrap();
        assert_eq!(next.code(), 34);
    }

    #[test]
    fn decode_parts_ignores_unknown_fields_and_quotes_numeric_keys() {
        let header = br#"{"code":0,"flag":1,"opaque":7,"language":"JAVA","unknownField":true,
            "extFields":{"offset":"100",1:"x"}}"#;
        let cmd = RemotingCommand::decode_parts(header, None).unwrap();
        assert_eq!(cmd.opaque(), 7);
        assert!(cmd.is_response_type());
        let fields = cmd.ext_fields().unwrap();
        assert_eq!(fields.get("offset").map(|v| v.as_str()), Some("100"));
        assert_eq!(fields.get("1").map(|v| v.as_str()), Some("x"));
    }
}
