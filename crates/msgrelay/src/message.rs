// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed 19-byte wire record.
//!
//! ```text
//! offset  0      2     3            11           19
//!         +------+-----+------------+------------+
//!         | size | type|     id     |    data    |
//!         | u16  | u8  |    u64     |    u64     |
//!         +------+-----+------------+------------+
//! ```
//!
//! Fields are packed in declared order with no padding. Byte order is
//! host-native, so sender and receiver must share endianness.

use crate::containers::Keyed;
use crate::error::{Error, Result};
use std::fmt;

/// Message identifier; the deduplication and table key.
pub type MsgId = u64;

/// Exact encoded size of a [`Message`].
pub const MESSAGE_WIRE_SIZE: usize = 19;

const SIZE_OFFSET: usize = 0;
const TYPE_OFFSET: usize = 2;
const ID_OFFSET: usize = 3;
const DATA_OFFSET: usize = 11;

/// One ingested record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Message {
    pub size: u16,
    pub msg_type: u8,
    /// Per-sender sequence; not globally monotonic.
    pub id: MsgId,
    /// Payload, also the relay selection criterion.
    pub data: u64,
}

impl Message {
    pub const fn new(size: u16, msg_type: u8, id: MsgId, data: u64) -> Self {
        Self {
            size,
            msg_type,
            id,
            data,
        }
    }

    /// Encode into a fresh wire buffer.
    pub fn encode(&self) -> [u8; MESSAGE_WIRE_SIZE] {
        let mut buf = [0u8; MESSAGE_WIRE_SIZE];
        buf[SIZE_OFFSET..TYPE_OFFSET].copy_from_slice(&self.size.to_ne_bytes());
        buf[TYPE_OFFSET] = self.msg_type;
        buf[ID_OFFSET..DATA_OFFSET].copy_from_slice(&self.id.to_ne_bytes());
        buf[DATA_OFFSET..MESSAGE_WIRE_SIZE].copy_from_slice(&self.data.to_ne_bytes());
        buf
    }

    /// Encode into the front of `dst`, returning the bytes written.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        if dst.len() < MESSAGE_WIRE_SIZE {
            return Err(Error::Truncated {
                expected: MESSAGE_WIRE_SIZE,
                actual: dst.len(),
            });
        }
        dst[..MESSAGE_WIRE_SIZE].copy_from_slice(&self.encode());
        Ok(MESSAGE_WIRE_SIZE)
    }

    /// Decode from the front of `src`; trailing bytes are ignored.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let Some(buf) = src.get(..MESSAGE_WIRE_SIZE) else {
            return Err(Error::Truncated {
                expected: MESSAGE_WIRE_SIZE,
                actual: src.len(),
            });
        };

        let mut size = [0u8; 2];
        size.copy_from_slice(&buf[SIZE_OFFSET..TYPE_OFFSET]);
        let mut id = [0u8; 8];
        id.copy_from_slice(&buf[ID_OFFSET..DATA_OFFSET]);
        let mut data = [0u8; 8];
        data.copy_from_slice(&buf[DATA_OFFSET..MESSAGE_WIRE_SIZE]);

        Ok(Self {
            size: u16::from_ne_bytes(size),
            msg_type: buf[TYPE_OFFSET],
            id: u64::from_ne_bytes(id),
            data: u64::from_ne_bytes(data),
        })
    }
}

impl Keyed for Message {
    #[inline]
    fn key(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Msg] Size: {}, Type: {}, Id: {}, Data: {}",
            self.size, self.msg_type, self.id, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout_is_packed() {
        let msg = Message::new(0x0102, 0x03, 0x0405_0607_0809_0a0b, 0x0c0d_0e0f_1011_1213);
        let buf = msg.encode();
        assert_eq!(buf.len(), 19);
        assert_eq!(&buf[0..2], &0x0102u16.to_ne_bytes());
        assert_eq!(buf[2], 0x03);
        assert_eq!(&buf[3..11], &0x0405_0607_0809_0a0bu64.to_ne_bytes());
        assert_eq!(&buf[11..19], &0x0c0d_0e0f_1011_1213u64.to_ne_bytes());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let msg = Message::new(42, 7, 99, 10);
        let mut buf = [0xAAu8; 64];
        assert_eq!(msg.encode_into(&mut buf).unwrap(), MESSAGE_WIRE_SIZE);
        assert_eq!(Message::decode(&buf).unwrap(), msg);
    }

    #[test]
    fn test_decode_truncated() {
        let err = Message::decode(&[0u8; 18]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                expected: 19,
                actual: 18
            }
        ));
    }

    #[test]
    fn test_encode_into_small_buffer() {
        let mut buf = [0u8; 4];
        assert!(Message::default().encode_into(&mut buf).is_err());
    }

    #[test]
    fn test_display() {
        let msg = Message::new(12, 34, 5, 10);
        assert_eq!(msg.to_string(), "[Msg] Size: 12, Type: 34, Id: 5, Data: 10");
    }
}
