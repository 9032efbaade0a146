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

macro_rules! define_request_code {
    (
        $(#[$enum_meta:meta])*
        pub enum $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[repr(i32)]
        pub enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl From<$enum_name> for i32 {
            #[inline]
            fn from(value: $enum_name) -> Self {
                value as i32
            }
        }

        impl From<i32> for $enum_name {
            #[inline]
            fn from(value: i32) -> Self {
                match value {
                    $($value => $enum_name::$variant,)*
                    _ => $enum_name::Unknown,
                }
            }
        }

        impl $enum_name {
            #[inline]
            pub const fn to_i32(self) -> i32 {
                self as i32
            }

            #[inline]
            pub const fn is_unknown(&self) -> bool {
                matches!(self, Self::Unknown)
            }
        }
    };
}

define_request_code! {
    /// Opcodes the client sends, plus the broker-initiated ones it must recognize.
    #[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
    pub enum RequestCode {
        PullMessage = 11,
        SearchOffsetByTimestamp = 29,
        GetMaxOffset = 30,
        HeartBeat = 34,
        UnregisterClient = 35,
        NotifyConsumerIdsChanged = 40,
        GetRouteinfoByTopic = 105,
        Unknown = -9999,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip_through_i32() {
        assert_eq!(i32::from(RequestCode::GetRouteinfoByTopic), 105);
        assert_eq!(RequestCode::from(34), RequestCode::HeartBeat);
        assert_eq!(RequestCode::from(40), RequestCode::NotifyConsumerIdsChanged);
    }

    #[test]
    fn unmapped_code_is_unknown() {
        assert!(RequestCode::from(12345).is_unknown());
        assert!(!RequestCode::PullMessage.is_unknown());
    }
}
