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

use std::net::IpAddr;

pub struct NetworkUtil;

impl NetworkUtil {
    /// First non-loopback address of this host, IPv4 preferred.
    pub fn get_local_address() -> Option<String> {
        match local_ip_address::local_ip() {
            Ok(value) => Some(Self::ip_to_string(value)),
            Err(_) => local_ip_address::local_ipv6().ok().map(Self::ip_to_string),
        }
    }

    fn ip_to_string(ip: IpAddr) -> String {
        match ip {
            IpAddr::V4(ip) => ip.to_string(),
            IpAddr::V6(ip) => ip.to_string(),
        }
    }

    /// Splits `host:port`, rejecting anything without a numeric port.
    pub fn split_host_port(addr: &str) -> Option<(&str, u16)> {
        let (host, port) = addr.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        port.parse::<u16>().ok().map(|port| (host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_host_port_accepts_valid_address() {
        assert_eq!(NetworkUtil::split_host_port("127.0.0.1:9876"), Some(("127.0.0.1", 9876)));
    }

    #[test]
    fn split_host_port_rejects_missing_port() {
        assert_eq!(NetworkUtil::split_host_port("127.0.0.1"), None);
        assert_eq!(NetworkUtil::split_host_port(":9876"), None);
        assert_eq!(NetworkUtil::split_host_port("host:port"), None);
    }
}
