use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::model::{AttrValue, ScalarType};

/// File magic, first four bytes of every container.
pub const MAGIC: &[u8; 4] = b"SLT5";

/// Current container format version.
pub const VERSION: u32 = 1;

/// Raw bytes per compressed chunk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Footer length: index offset + index length, both u64.
pub const FOOTER_LEN: usize = 16;

/// How a string dataset's bytes are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrEncoding {
    /// Every element padded with NULs to the same byte width.
    Fixed { width: u32 },
    /// Per-element end offsets (u64 little-endian) followed by a byte heap.
    Heap,
}

/// Index entry for one dataset: where its chunks live and what they decode
/// to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetIndex {
    pub scalar_type: ScalarType,
    pub count: u64,
    pub str_encoding: Option<StrEncoding>,
    pub offset: u64,
    pub raw_len: u64,
    pub chunks: u32,
    pub attrs: BTreeMap<String, AttrValue>,
}

/// Index entry for one group.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupIndex {
    pub attrs: BTreeMap<String, AttrValue>,
    pub datasets: BTreeMap<String, DatasetIndex>,
    pub groups: BTreeMap<String, GroupIndex>,
}

/// The whole structural index, bincode-encoded between payload and footer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileIndex {
    pub root: GroupIndex,
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed);
/// `offset` is only used to annotate errors.
pub(crate) fn decode_varint(data: &[u8], offset: u64) -> StoreResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(StoreError::Corrupt {
                offset,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(StoreError::Corrupt {
        offset,
        reason: "truncated varint".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip_small() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 42);
        let (val, consumed) = decode_varint(&buf, 0).unwrap();
        assert_eq!(val, 42);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn varint_roundtrip_large() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 1_000_000);
        let (val, _) = decode_varint(&buf, 0).unwrap();
        assert_eq!(val, 1_000_000);
    }

    #[test]
    fn varint_max_u64() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, u64::MAX);
        let (val, _) = decode_varint(&buf, 0).unwrap();
        assert_eq!(val, u64::MAX);
    }

    #[test]
    fn decode_varint_truncated() {
        let err = decode_varint(&[0x80], 7).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { offset: 7, .. }));
    }
}
