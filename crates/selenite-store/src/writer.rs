use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::layout::{
    encode_varint, DatasetIndex, FileIndex, GroupIndex, StrEncoding, CHUNK_SIZE, MAGIC, VERSION,
};
use crate::model::{Container, DataBuffer, Dataset, Group, ScalarType};

/// Serialize a container tree to disk.
///
/// Layout: magic, version, per-dataset chunk streams, bincode structural
/// index, then a footer holding the index offset and length.
pub(crate) fn write_container(container: &Container, path: &Path) -> StoreResult<()> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_be_bytes());

    let root = encode_group(container.root(), &mut out)?;
    let index = FileIndex { root };
    let index_bytes =
        bincode::serialize(&index).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let index_offset = out.len() as u64;
    out.extend_from_slice(&index_bytes);
    out.extend_from_slice(&index_offset.to_be_bytes());
    out.extend_from_slice(&(index_bytes.len() as u64).to_be_bytes());

    std::fs::write(path, &out)?;
    Ok(())
}

fn encode_group(group: &Group, out: &mut Vec<u8>) -> StoreResult<GroupIndex> {
    let mut datasets = BTreeMap::new();
    for (name, dataset) in group.datasets_map() {
        datasets.insert(name.clone(), encode_dataset(dataset, out)?);
    }
    let mut groups = BTreeMap::new();
    for (name, child) in group.groups_map() {
        groups.insert(name.clone(), encode_group(child, out)?);
    }
    Ok(GroupIndex {
        attrs: group.attrs_map().clone(),
        datasets,
        groups,
    })
}

fn encode_dataset(dataset: &Dataset, out: &mut Vec<u8>) -> StoreResult<DatasetIndex> {
    let (raw, str_encoding) = encode_payload(dataset)?;
    let offset = out.len() as u64;
    let mut chunks = 0u32;
    for chunk in raw.chunks(CHUNK_SIZE) {
        let compressed = zstd::encode_all(chunk, 3)
            .map_err(|e| StoreError::CompressionFailed(e.to_string()))?;
        encode_varint(out, chunk.len() as u64);
        encode_varint(out, compressed.len() as u64);
        out.extend_from_slice(&crc32fast::hash(&compressed).to_be_bytes());
        out.extend_from_slice(&compressed);
        chunks += 1;
    }
    Ok(DatasetIndex {
        scalar_type: dataset.scalar_type(),
        count: dataset.len() as u64,
        str_encoding,
        offset,
        raw_len: raw.len() as u64,
        chunks,
        attrs: dataset.attrs_map().clone(),
    })
}

fn encode_payload(dataset: &Dataset) -> StoreResult<(Vec<u8>, Option<StrEncoding>)> {
    match dataset.data() {
        DataBuffer::Ints(values) => Ok((encode_ints(values, dataset.scalar_type())?, None)),
        DataBuffer::Floats(values) => {
            let mut raw = Vec::with_capacity(values.len() * 8);
            for v in values {
                raw.extend_from_slice(&v.to_bits().to_le_bytes());
            }
            Ok((raw, None))
        }
        DataBuffer::Strings(values) => {
            let (raw, encoding) = encode_strings(values);
            Ok((raw, Some(encoding)))
        }
    }
}

fn encode_ints(values: &[i64], scalar_type: ScalarType) -> StoreResult<Vec<u8>> {
    let Some((lo, hi)) = scalar_type.bounds() else {
        return Err(StoreError::WrongDatasetType {
            expected: "integer",
            actual: "floating-point",
        });
    };
    let mut raw = Vec::with_capacity(values.len() * scalar_type.element_bytes());
    for (index, &value) in values.iter().enumerate() {
        if value < lo || value > hi {
            return Err(StoreError::ValueOutsideWidth { index, value });
        }
        match scalar_type {
            ScalarType::I8 => raw.push(value as i8 as u8),
            ScalarType::U8 => raw.push(value as u8),
            ScalarType::I16 => raw.extend_from_slice(&(value as i16).to_le_bytes()),
            ScalarType::U16 => raw.extend_from_slice(&(value as u16).to_le_bytes()),
            ScalarType::I32 => raw.extend_from_slice(&(value as i32).to_le_bytes()),
            ScalarType::U32 => raw.extend_from_slice(&(value as u32).to_le_bytes()),
            ScalarType::I64 => raw.extend_from_slice(&value.to_le_bytes()),
            ScalarType::F64 | ScalarType::Str => unreachable!("guarded by bounds() above"),
        }
    }
    Ok(raw)
}

/// Pick the cheaper of the two string layouts.
///
/// Fixed-width costs `count * max_len`; the heap form costs eight offset
/// bytes per element plus the actual text. Interior NULs force the heap
/// form because padded decoding strips trailing NULs.
fn encode_strings(values: &[String]) -> (Vec<u8>, StrEncoding) {
    let count = values.len();
    let max_len = values.iter().map(String::len).max().unwrap_or(0);
    let total: usize = values.iter().map(String::len).sum();
    let has_nul = values.iter().any(|s| s.as_bytes().contains(&0));

    let fixed_cost = count * max_len;
    let heap_cost = count * 8 + total;
    if !has_nul && fixed_cost <= heap_cost {
        let mut raw = vec![0u8; fixed_cost];
        for (i, s) in values.iter().enumerate() {
            let start = i * max_len;
            raw[start..start + s.len()].copy_from_slice(s.as_bytes());
        }
        (raw, StrEncoding::Fixed {
            width: max_len as u32,
        })
    } else {
        let mut raw = Vec::with_capacity(heap_cost);
        let mut end = 0u64;
        for s in values {
            end += s.len() as u64;
            raw.extend_from_slice(&end.to_le_bytes());
        }
        for s in values {
            raw.extend_from_slice(s.as_bytes());
        }
        (raw, StrEncoding::Heap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_stay_fixed_width() {
        let values = vec!["ab".to_string(), "c".to_string(), "def".to_string()];
        let (raw, encoding) = encode_strings(&values);
        assert_eq!(encoding, StrEncoding::Fixed { width: 3 });
        assert_eq!(raw.len(), 9);
    }

    #[test]
    fn skewed_lengths_switch_to_heap() {
        // One long string would force every element to 1000 padded bytes.
        let mut values = vec![String::new(); 100];
        values[0] = "x".repeat(1000);
        let (raw, encoding) = encode_strings(&values);
        assert_eq!(encoding, StrEncoding::Heap);
        assert_eq!(raw.len(), 100 * 8 + 1000);
    }

    #[test]
    fn interior_nul_forces_heap() {
        let values = vec!["a\0b".to_string()];
        let (_, encoding) = encode_strings(&values);
        assert_eq!(encoding, StrEncoding::Heap);
    }

    #[test]
    fn empty_string_vector() {
        let (raw, encoding) = encode_strings(&[]);
        assert!(raw.is_empty());
        assert_eq!(encoding, StrEncoding::Fixed { width: 0 });
    }

    #[test]
    fn ints_are_width_checked() {
        let err = encode_ints(&[0, 300], ScalarType::U8).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ValueOutsideWidth { index: 1, value: 300 }
        ));
    }

    #[test]
    fn narrow_widths_use_fewer_bytes() {
        let raw8 = encode_ints(&[1, 2, 3], ScalarType::I8).unwrap();
        let raw64 = encode_ints(&[1, 2, 3], ScalarType::I64).unwrap();
        assert_eq!(raw8.len(), 3);
        assert_eq!(raw64.len(), 24);
    }
}
