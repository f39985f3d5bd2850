//! Encoder half of the plainbuffer row codec.
//!
//! Every multi-byte integer is little-endian. Each cell carries its own CRC8
//! and each row folds its cells' CRC8 bytes plus a delete-marker byte into a
//! trailing row CRC8.

use crate::error::OtsError;
use crate::plainbuffer::consts::{CellDeleteMarker, Tag, VariantType, HEADER};
use crate::security::{crc8, crc8_bytes, crc8_u32, crc8_u64};
use crate::time::UtcTime;
use crate::types::change::{
    RowDeleteChange, RowPutChange, RowUpdate, RowUpdateChange, RowUpdateOp,
};
use crate::types::row::{Attribute, PrimaryKey, PrimaryKeyColumn};
use crate::types::value::{AttributeValue, PrimaryKeyValue};

fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_tag(out: &mut Vec<u8>, tag: Tag) {
    write_u8(out, tag.as_u8());
}

fn write_header(out: &mut Vec<u8>) {
    write_u32(out, HEADER);
}

fn write_cell_name(out: &mut Vec<u8>, checksum: &mut u8, name: &str) {
    write_tag(out, Tag::CellName);
    write_u32(out, name.len() as u32);
    out.extend_from_slice(name.as_bytes());
    crc8_bytes(checksum, name.as_bytes());
}

fn write_int_value(out: &mut Vec<u8>, checksum: &mut u8, value: u64) {
    write_u32(out, 1 + 8);
    write_u8(out, VariantType::Integer.as_u8());
    write_u64(out, value);
    crc8(checksum, VariantType::Integer.as_u8());
    crc8_u64(checksum, value);
}

fn write_str_blob_value(out: &mut Vec<u8>, checksum: &mut u8, bytes: &[u8], vt: VariantType) {
    write_u32(out, 1 + 4 + bytes.len() as u32);
    write_u8(out, vt.as_u8());
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
    crc8(checksum, vt.as_u8());
    crc8_u32(checksum, bytes.len() as u32);
    crc8_bytes(checksum, bytes);
}

fn write_fp_value(out: &mut Vec<u8>, checksum: &mut u8, value: f64) {
    let bits = value.to_bits();
    write_u32(out, 1 + 8);
    write_u8(out, VariantType::Double.as_u8());
    write_u64(out, bits);
    crc8(checksum, VariantType::Double.as_u8());
    crc8_u64(checksum, bits);
}

fn write_bool_value(out: &mut Vec<u8>, checksum: &mut u8, value: bool) {
    let byte: u8 = if value { 1 } else { 0 };
    write_u32(out, 2);
    write_u8(out, VariantType::Boolean.as_u8());
    write_u8(out, byte);
    crc8(checksum, VariantType::Boolean.as_u8());
    crc8(checksum, byte);
}

fn write_special_pk_value(out: &mut Vec<u8>, checksum: &mut u8, vt: VariantType) {
    write_u32(out, 1);
    write_u8(out, vt.as_u8());
    crc8(checksum, vt.as_u8());
}

fn write_pk_value(
    out: &mut Vec<u8>,
    checksum: &mut u8,
    value: &PrimaryKeyValue,
) -> Result<(), OtsError> {
    write_tag(out, Tag::CellValue);
    match value {
        PrimaryKeyValue::Integer(v) => write_int_value(out, checksum, *v as u64),
        PrimaryKeyValue::Str(v) => {
            write_str_blob_value(out, checksum, v.as_bytes(), VariantType::String)
        }
        PrimaryKeyValue::Blob(v) => write_str_blob_value(out, checksum, v, VariantType::Blob),
        PrimaryKeyValue::InfMin => write_special_pk_value(out, checksum, VariantType::InfMin),
        PrimaryKeyValue::InfMax => write_special_pk_value(out, checksum, VariantType::InfMax),
        PrimaryKeyValue::AutoIncrement => {
            write_special_pk_value(out, checksum, VariantType::AutoIncrement)
        }
        PrimaryKeyValue::None => {
            return Err(OtsError::parameter_invalid(
                "An absent primary-key value cannot be encoded.",
            ))
        }
    }
    Ok(())
}

fn write_attr_value(
    out: &mut Vec<u8>,
    checksum: &mut u8,
    value: &AttributeValue,
) -> Result<(), OtsError> {
    write_tag(out, Tag::CellValue);
    match value {
        AttributeValue::Integer(v) => write_int_value(out, checksum, *v as u64),
        AttributeValue::Str(v) => {
            write_str_blob_value(out, checksum, v.as_bytes(), VariantType::String)
        }
        AttributeValue::Blob(v) => write_str_blob_value(out, checksum, v, VariantType::Blob),
        AttributeValue::Float(v) => write_fp_value(out, checksum, *v),
        AttributeValue::Boolean(v) => write_bool_value(out, checksum, *v),
        AttributeValue::None => {
            return Err(OtsError::parameter_invalid(
                "An absent attribute value cannot be encoded.",
            ))
        }
    }
    Ok(())
}

fn write_cell_checksum(out: &mut Vec<u8>, checksum: u8) {
    write_tag(out, Tag::CellChecksum);
    write_u8(out, checksum);
}

fn write_pk_column(
    out: &mut Vec<u8>,
    row_checksum: &mut u8,
    column: &PrimaryKeyColumn,
) -> Result<(), OtsError> {
    let mut cell_checksum = 0u8;
    write_tag(out, Tag::Cell);
    write_cell_name(out, &mut cell_checksum, &column.name);
    write_pk_value(out, &mut cell_checksum, &column.value)?;
    write_cell_checksum(out, cell_checksum);
    crc8(row_checksum, cell_checksum);
    Ok(())
}

fn write_row_key(
    out: &mut Vec<u8>,
    row_checksum: &mut u8,
    primary_key: &PrimaryKey,
) -> Result<(), OtsError> {
    write_tag(out, Tag::RowKey);
    for column in &primary_key.columns {
        write_pk_column(out, row_checksum, column)?;
    }
    Ok(())
}

fn write_timestamp(out: &mut Vec<u8>, checksum: &mut u8, timestamp: UtcTime) {
    write_tag(out, Tag::CellTimestamp);
    let msec = timestamp.to_msec() as u64;
    write_u64(out, msec);
    crc8_u64(checksum, msec);
}

fn write_attr(out: &mut Vec<u8>, row_checksum: &mut u8, attr: &Attribute) -> Result<(), OtsError> {
    let mut cell_checksum = 0u8;
    write_tag(out, Tag::Cell);
    write_cell_name(out, &mut cell_checksum, &attr.name);
    write_attr_value(out, &mut cell_checksum, &attr.value)?;
    if let Some(ts) = attr.timestamp {
        write_timestamp(out, &mut cell_checksum, ts);
    }
    write_cell_checksum(out, cell_checksum);
    crc8(row_checksum, cell_checksum);
    Ok(())
}

fn write_attrs(
    out: &mut Vec<u8>,
    row_checksum: &mut u8,
    attrs: &[Attribute],
) -> Result<(), OtsError> {
    if attrs.is_empty() {
        return Ok(());
    }
    write_tag(out, Tag::RowData);
    for attr in attrs {
        write_attr(out, row_checksum, attr)?;
    }
    Ok(())
}

fn write_update(
    out: &mut Vec<u8>,
    row_checksum: &mut u8,
    update: &RowUpdate,
) -> Result<(), OtsError> {
    let mut cell_checksum = 0u8;
    write_tag(out, Tag::Cell);
    write_cell_name(out, &mut cell_checksum, &update.name);
    if let Some(value) = &update.value {
        write_attr_value(out, &mut cell_checksum, value)?;
    }
    match update.op {
        RowUpdateOp::Put => {}
        RowUpdateOp::DeleteOneVersion => {
            write_tag(out, Tag::CellType);
            write_u8(out, CellDeleteMarker::DeleteOneVersion.as_u8());
        }
        RowUpdateOp::DeleteAllVersions => {
            write_tag(out, Tag::CellType);
            write_u8(out, CellDeleteMarker::DeleteAllVersions.as_u8());
        }
    }
    if let Some(ts) = update.timestamp {
        write_tag(out, Tag::CellTimestamp);
        write_u64(out, ts.to_msec() as u64);
    }
    // the checksum folds fields in a different order than they are written
    if let Some(ts) = update.timestamp {
        crc8_u64(&mut cell_checksum, ts.to_msec() as u64);
    }
    match update.op {
        RowUpdateOp::Put => {}
        RowUpdateOp::DeleteOneVersion => {
            crc8(&mut cell_checksum, CellDeleteMarker::DeleteOneVersion.as_u8());
        }
        RowUpdateOp::DeleteAllVersions => {
            crc8(&mut cell_checksum, CellDeleteMarker::DeleteAllVersions.as_u8());
        }
    }
    write_cell_checksum(out, cell_checksum);
    crc8(row_checksum, cell_checksum);
    Ok(())
}

fn write_delete_marker(out: &mut Vec<u8>, row_checksum: &mut u8) {
    write_tag(out, Tag::RowDeleteMarker);
    crc8(row_checksum, 1);
}

fn write_row_checksum(out: &mut Vec<u8>, checksum: u8) {
    write_tag(out, Tag::RowChecksum);
    write_u8(out, checksum);
}

/// Encodes a bare primary key, as range boundaries and point reads carry.
pub fn encode_primary_key(primary_key: &PrimaryKey) -> Result<Vec<u8>, OtsError> {
    let mut out = Vec::new();
    let mut checksum = 0u8;
    write_header(&mut out);
    write_row_key(&mut out, &mut checksum, primary_key)?;
    crc8(&mut checksum, 0); // not a delete
    write_row_checksum(&mut out, checksum);
    Ok(out)
}

/// Encodes a put change: key plus full attribute list.
pub fn encode_put(change: &RowPutChange) -> Result<Vec<u8>, OtsError> {
    let mut out = Vec::new();
    let mut checksum = 0u8;
    write_header(&mut out);
    write_row_key(&mut out, &mut checksum, &change.primary_key)?;
    write_attrs(&mut out, &mut checksum, &change.attributes)?;
    crc8(&mut checksum, 0);
    write_row_checksum(&mut out, checksum);
    Ok(out)
}

/// Encodes an update change: key plus cell-level mutations.
pub fn encode_update(change: &RowUpdateChange) -> Result<Vec<u8>, OtsError> {
    let mut out = Vec::new();
    let mut checksum = 0u8;
    write_header(&mut out);
    write_row_key(&mut out, &mut checksum, &change.primary_key)?;
    if !change.updates.is_empty() {
        write_tag(&mut out, Tag::RowData);
        for update in &change.updates {
            write_update(&mut out, &mut checksum, update)?;
        }
    }
    crc8(&mut checksum, 0);
    write_row_checksum(&mut out, checksum);
    Ok(out)
}

/// Encodes a delete change: key plus the row-delete marker.
pub fn encode_delete(change: &RowDeleteChange) -> Result<Vec<u8>, OtsError> {
    let mut out = Vec::new();
    let mut checksum = 0u8;
    write_header(&mut out);
    write_row_key(&mut out, &mut checksum, &change.primary_key)?;
    write_delete_marker(&mut out, &mut checksum);
    write_row_checksum(&mut out, checksum);
    Ok(out)
}
