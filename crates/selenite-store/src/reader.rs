use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::layout::{
    decode_varint, DatasetIndex, FileIndex, GroupIndex, StrEncoding, FOOTER_LEN, MAGIC, VERSION,
};
use crate::model::{Container, DataBuffer, Dataset, Group, ScalarType};

/// Read a container file back into memory, verifying every chunk CRC.
pub(crate) fn read_container(path: &Path) -> StoreResult<Container> {
    let data = std::fs::read(path)?;
    if data.len() < 8 + FOOTER_LEN {
        return Err(StoreError::Corrupt {
            offset: 0,
            reason: "container too short".into(),
        });
    }
    if &data[0..4] != MAGIC {
        return Err(StoreError::InvalidMagic {
            expected: String::from_utf8_lossy(MAGIC).into(),
            actual: String::from_utf8_lossy(&data[0..4]).into(),
        });
    }
    let version = u32::from_be_bytes(data[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let footer_at = data.len() - FOOTER_LEN;
    let index_offset =
        u64::from_be_bytes(data[footer_at..footer_at + 8].try_into().unwrap()) as usize;
    let index_len = u64::from_be_bytes(data[footer_at + 8..].try_into().unwrap()) as usize;
    if index_offset < 8 || index_offset.saturating_add(index_len) > footer_at {
        return Err(StoreError::IndexCorrupted(format!(
            "index span {index_offset}+{index_len} outside payload region"
        )));
    }

    let index: FileIndex = bincode::deserialize(&data[index_offset..index_offset + index_len])
        .map_err(|e| StoreError::IndexCorrupted(e.to_string()))?;
    let root = decode_group(&data, &index.root)?;
    Ok(Container::from_root(root))
}

fn decode_group(data: &[u8], index: &GroupIndex) -> StoreResult<Group> {
    let mut datasets = BTreeMap::new();
    for (name, entry) in &index.datasets {
        datasets.insert(name.clone(), decode_dataset(data, entry)?);
    }
    let mut groups = BTreeMap::new();
    for (name, entry) in &index.groups {
        groups.insert(name.clone(), decode_group(data, entry)?);
    }
    Ok(Group::from_parts(index.attrs.clone(), datasets, groups))
}

fn decode_dataset(data: &[u8], index: &DatasetIndex) -> StoreResult<Dataset> {
    let raw = read_chunks(data, index)?;
    let buffer = decode_payload(&raw, index)?;
    Ok(Dataset::from_parts(
        index.scalar_type,
        buffer,
        index.attrs.clone(),
    ))
}

fn read_chunks(data: &[u8], index: &DatasetIndex) -> StoreResult<Vec<u8>> {
    let mut raw = Vec::with_capacity(index.raw_len as usize);
    let mut pos = index.offset as usize;
    for _ in 0..index.chunks {
        if pos > data.len() {
            return Err(StoreError::Corrupt {
                offset: pos as u64,
                reason: "chunk offset beyond container".into(),
            });
        }
        let (chunk_raw_len, consumed) = decode_varint(&data[pos..], pos as u64)?;
        pos += consumed;
        let (comp_len, consumed) = decode_varint(&data[pos..], pos as u64)?;
        pos += consumed;

        if pos + 4 > data.len() {
            return Err(StoreError::Corrupt {
                offset: pos as u64,
                reason: "truncated chunk header".into(),
            });
        }
        let expected_crc = u32::from_be_bytes(data[pos..pos + 4].try_into().unwrap());
        pos += 4;

        let end = pos + comp_len as usize;
        if end > data.len() {
            return Err(StoreError::Corrupt {
                offset: pos as u64,
                reason: "compressed chunk extends beyond container".into(),
            });
        }
        let compressed = &data[pos..end];
        if crc32fast::hash(compressed) != expected_crc {
            return Err(StoreError::CrcMismatch {
                offset: pos as u64,
            });
        }
        let chunk = zstd::decode_all(compressed)
            .map_err(|e| StoreError::DecompressionFailed(e.to_string()))?;
        if chunk.len() != chunk_raw_len as usize {
            return Err(StoreError::Corrupt {
                offset: pos as u64,
                reason: format!(
                    "chunk size mismatch: expected {chunk_raw_len}, got {}",
                    chunk.len()
                ),
            });
        }
        raw.extend_from_slice(&chunk);
        pos = end;
    }
    if raw.len() != index.raw_len as usize {
        return Err(StoreError::Corrupt {
            offset: index.offset,
            reason: format!(
                "dataset size mismatch: expected {}, got {}",
                index.raw_len,
                raw.len()
            ),
        });
    }
    Ok(raw)
}

fn decode_payload(raw: &[u8], index: &DatasetIndex) -> StoreResult<DataBuffer> {
    let count = index.count as usize;
    match index.scalar_type {
        ScalarType::Str => decode_strings(raw, count, index),
        ScalarType::F64 => {
            check_payload_len(raw, count, 8, index)?;
            Ok(DataBuffer::Floats(
                raw.chunks_exact(8)
                    .map(|c| f64::from_bits(u64::from_le_bytes(c.try_into().unwrap())))
                    .collect(),
            ))
        }
        ty => {
            check_payload_len(raw, count, ty.element_bytes(), index)?;
            let values = match ty {
                ScalarType::I8 => raw.iter().map(|&b| b as i8 as i64).collect(),
                ScalarType::U8 => raw.iter().map(|&b| b as i64).collect(),
                ScalarType::I16 => le_ints(raw, 2, |c| i16::from_le_bytes(c.try_into().unwrap()) as i64),
                ScalarType::U16 => le_ints(raw, 2, |c| u16::from_le_bytes(c.try_into().unwrap()) as i64),
                ScalarType::I32 => le_ints(raw, 4, |c| i32::from_le_bytes(c.try_into().unwrap()) as i64),
                ScalarType::U32 => le_ints(raw, 4, |c| u32::from_le_bytes(c.try_into().unwrap()) as i64),
                ScalarType::I64 => le_ints(raw, 8, |c| i64::from_le_bytes(c.try_into().unwrap())),
                ScalarType::F64 | ScalarType::Str => unreachable!("handled above"),
            };
            Ok(DataBuffer::Ints(values))
        }
    }
}

fn le_ints(raw: &[u8], width: usize, decode: impl Fn(&[u8]) -> i64) -> Vec<i64> {
    raw.chunks_exact(width).map(decode).collect()
}

fn check_payload_len(
    raw: &[u8],
    count: usize,
    element_bytes: usize,
    index: &DatasetIndex,
) -> StoreResult<()> {
    if raw.len() != count * element_bytes {
        return Err(StoreError::Corrupt {
            offset: index.offset,
            reason: format!(
                "payload holds {} bytes, expected {} elements of {} bytes",
                raw.len(),
                count,
                element_bytes
            ),
        });
    }
    Ok(())
}

fn decode_strings(raw: &[u8], count: usize, index: &DatasetIndex) -> StoreResult<DataBuffer> {
    let corrupt = |reason: String| StoreError::Corrupt {
        offset: index.offset,
        reason,
    };
    match index.str_encoding {
        None => Err(corrupt("string dataset lacks an encoding".into())),
        Some(StrEncoding::Fixed { width }) => {
            let width = width as usize;
            if raw.len() != count * width {
                return Err(corrupt(format!(
                    "fixed-width payload holds {} bytes, expected {}",
                    raw.len(),
                    count * width
                )));
            }
            let mut values = Vec::with_capacity(count);
            if width == 0 {
                values.resize(count, String::new());
                return Ok(DataBuffer::Strings(values));
            }
            for cell in raw.chunks_exact(width) {
                let end = cell.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
                values.push(utf8(&cell[..end], &corrupt)?);
            }
            Ok(DataBuffer::Strings(values))
        }
        Some(StrEncoding::Heap) => {
            let table = count * 8;
            if raw.len() < table {
                return Err(corrupt("heap offset table truncated".into()));
            }
            let heap = &raw[table..];
            let mut values = Vec::with_capacity(count);
            let mut start = 0usize;
            for i in 0..count {
                let end =
                    u64::from_le_bytes(raw[i * 8..i * 8 + 8].try_into().unwrap()) as usize;
                if end < start || end > heap.len() {
                    return Err(corrupt(format!("heap offset {end} out of order or range")));
                }
                values.push(utf8(&heap[start..end], &corrupt)?);
                start = end;
            }
            if start != heap.len() {
                return Err(corrupt("heap bytes left over after last element".into()));
            }
            Ok(DataBuffer::Strings(values))
        }
    }
}

fn utf8(bytes: &[u8], corrupt: &impl Fn(String) -> StoreError) -> StoreResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| corrupt("string data is not valid UTF-8".into()))
}
