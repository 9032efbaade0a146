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

//! Remoting layer of the RocketMQ client runtime.
//!
//! Frames [`RemotingCommand`](protocol::remoting_command::RemotingCommand)s onto TCP,
//! correlates responses with their requests by opaque id and hands broker-initiated
//! requests to a [`RequestProcessor`](runtime::processor::RequestProcessor).

pub mod base;
pub mod clients;
pub mod code;
pub mod codec;
pub mod connection;
pub mod protocol;
pub mod remoting;
pub mod request_processor;
pub mod runtime;
