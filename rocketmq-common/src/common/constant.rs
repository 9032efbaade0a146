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


/// Permission bits of a topic queue on a broker.
pub struct PermName;

impl PermName {
    pub const INDEX_PERM_WRITE: u32 = 1;
    pub const INDEX_PERM_READ: u32 = 2;

    pub const PERM_WRITE: u32 = 0x1 << Self::INDEX_PERM_WRITE;
    pub const PERM_READ: u32 = 0x1 << Self::INDEX_PERM_READ;

    #[inline]
    pub fn is_readable(perm: u32) -> bool {
        (perm & Self::PERM_READ) == Self::PERM_READ
    }

    #[inline]
    pub fn is_writeable(perm: u32) -> bool {
        (perm & Self::PERM_WRITE) == Self::PERM_WRITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_bits() {
        let rw = PermName::PERM_READ | PermName::PERM_WRITE;
        assert_eq!(rw, 6);
        assert!(PermName::is_readable(rw));
        assert!(PermName::is_writeable(rw));
        assert!(!PermName::is_writeable(PermName::PERM_READ));
        assert!(!PermName::is_readable(PermName::PERM_WRITE));
    }
}
