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

use std::borrow::Cow;

pub struct SerdeJsonUtils;

impl SerdeJsonUtils {
    pub fn from_json_str<T>(json: &str) -> rocketmq_error::RocketMQResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_slice<T>(json: &[u8]) -> rocketmq_error::RocketMQResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(json)?)
    }

    /// Decodes JSON written by peers that emit integer object keys without quotes
    /// (`{0:"127.0.0.1:10911"}`). Keys are normalized with [`Self::quote_numeric_keys`]
    /// before handing the text to serde.
    pub fn from_lenient_json_slice<T>(json: &[u8]) -> rocketmq_error::RocketMQResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let text = std::str::from_utf8(json)
            .map_err(|e| rocketmq_error::RocketMQError::decode_failed("json", e.to_string()))?;
        Self::from_json_str(&Self::quote_numeric_keys(text))
    }

    pub fn to_json_vec<T>(value: &T) -> rocketmq_error::RocketMQResult<Vec<u8>>
    where
        T: serde::Serialize,
    {
        serde_json::to_vec(value).map_err(|e| {
            rocketmq_error::SerializationError::encode_failed("json", e.to_string()).into()
        })
    }

    /// Wraps bare integer object keys in quotes so the text is standard JSON.
    ///
    /// Only a run of digits in key position (right after `{` or `,`, outside a string,
    /// followed by `:`) is rewritten. Returns the input unchanged when nothing needs quoting.
    pub fn quote_numeric_keys(json: &str) -> Cow<'_, str> {
        let bytes = json.as_bytes();
        let mut out: Option<String> = None;
        let mut copied = 0;
        let mut in_string = false;
        let mut escaped = false;
        let mut key_position = false;
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == b'\\' {
                    escaped = true;
                } else if c == b'"' {
                    in_string = false;
                }
                i += 1;
                continue;
            }
            match c {
                b'"' => {
                    in_string = true;
                    key_position = false;
                }
                b'{' | b',' => key_position = true,
                b' ' | b'\t' | b'\r' | b'\n' => {}
                b'0'..=b'9' | b'-' if key_position => {
                    let start = i;
                    let mut end = i + 1;
                    while end < bytes.len() && bytes[end].is_ascii_digit() {
                        end += 1;
                    }
                    let mut next = end;
                    while next < bytes.len() && bytes[next].is_ascii_whitespace() {
                        next += 1;
                    }
                    key_position = false;
                    if next < bytes.len() && bytes[next] == b':' {
                        let buf = out.get_or_insert_with(|| String::with_capacity(json.len() + 16));
                        buf.push_str(&json[copied..start]);
                        buf.push('"');
                        buf.push_str(&json[start..end]);
                        buf.push('"');
                        copied = end;
                    }
                    i = end;
                    continue;
                }
                _ => key_position = false,
            }
            i += 1;
        }

        match out {
            None => Cow::Borrowed(json),
            Some(mut buf) => {
                buf.push_str(&json[copied..]);
                Cow::Owned(buf)
            }
        }
    }
}
