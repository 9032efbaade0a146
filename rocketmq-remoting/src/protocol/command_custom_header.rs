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
use std::str::FromStr;

use cheetah_string::CheetahString;
use rocketmq_error::RocketMQError;
use rocketmq_error::RocketMQResult;
use rocketmq_error::SerializationError;

/// A typed protocol header carried in a command's `extFields`.
pub trait CommandCustomHeader {
    /// Checks the fields of the implementing type before it is sent.
    fn check_fields(&self) -> RocketMQResult<()> {
        Ok(())
    }

    /// Converts the header into the string map written to `extFields`.
    ///
    /// Returns `None` for a header with nothing to send.
    fn to_map(&self) -> Option<HashMap<CheetahString, CheetahString>>;
}

pub trait FromMap {
    type Error: From<RocketMQError>;

    type Target;

    /// Builds the header from a decoded `extFields` map.
    fn from(map: &HashMap<CheetahString, CheetahString>) -> Result<Self::Target, Self::Error>;
}

/// Returns the value of `field`, failing with `MissingField` when absent.
pub fn required_field(
    map: &HashMap<CheetahString, CheetahString>,
    field: &'static str,
) -> RocketMQResult<CheetahString> {
    map.get(field)
        .cloned()
        .ok_or_else(|| SerializationError::missing_field(field).into())
}

/// Parses the value of `field`; both an absent and an unparsable value are errors.
pub fn parse_field<T>(map: &HashMap<CheetahString, CheetahString>, field: &'static str) -> RocketMQResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = required_field(map, field)?;
    value
        .as_str()
        .trim()
        .parse::<T>()
        .map_err(|e| SerializationError::invalid_value(field, e.to_string()).into())
}
