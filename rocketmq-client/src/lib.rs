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


//! Client runtime of Apache RocketMQ.
//!
//! [`MQClientInstance`](factory::mq_client_instance::MQClientInstance) ties together the
//! route tables, the remoting client, heartbeat broadcast, offset queries and the pull
//! request queue that producers and consumers build on.

#![allow(clippy::result_large_err)]

pub mod base;
pub mod consumer;
pub mod factory;
pub mod implementation;
pub mod producer;
