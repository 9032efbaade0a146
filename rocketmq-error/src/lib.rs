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

//! # RocketMQ Client Error Handling
//!
//! A single error enum shared by the remoting layer and the client runtime. Every
//! failure a caller can act on falls into one of a few kinds:
//!
//! - connection errors ([`NetworkError`], wrapped by [`RocketMQError::Network`])
//! - invocation deadlines ([`RocketMQError::Timeout`])
//! - malformed frames ([`SerializationError`], wrapped by [`RocketMQError::Serialization`])
//! - unknown topics ([`RocketMQError::RouteNotFound`])
//! - non-success answers from a peer ([`RocketMQError::Remote`])
//!
//! ### Usage
//!
//! ```rust
//! use rocketmq_error::RocketMQError;
//! use rocketmq_error::RocketMQResult;
//!
//! fn connect(addr: &str) -> RocketMQResult<()> {
//!     if addr.is_empty() {
//!         return Err(RocketMQError::network_connection_failed(
//!             "localhost:9876",
//!             "invalid address",
//!         ));
//!     }
//!     Ok(())
//! }
//! # connect("localhost:9876").unwrap();
//! ```

pub mod unified;

pub use unified::NetworkError;
pub use unified::RocketMQError;
pub use unified::RocketMQResult;
pub use unified::SerializationError;
