//! Decoder half of the plainbuffer row codec.
//!
//! The decoder is strict: tag mismatches, length overruns, checksum
//! mismatches, variants that are illegal in context, and trailing bytes all
//! fail with `CorruptedResponse` carrying the offending offset.

use crate::error::OtsError;
use crate::plainbuffer::consts::{Tag, VariantType, HEADER};
use crate::security::{crc8, crc8_bytes, crc8_u32, crc8_u64};
use crate::time::UtcTime;
use crate::types::row::{Attribute, PrimaryKey, PrimaryKeyColumn, Row};
use crate::types::value::{AttributeValue, PrimaryKeyValue};

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn corrupted(&self, context: &str) -> OtsError {
        OtsError::corrupted_response(context, self.pos)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_u8(&mut self) -> Result<u8, OtsError> {
        if self.remaining() < 1 {
            return Err(self.corrupted("truncated byte"));
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_u32(&mut self) -> Result<u32, OtsError> {
        if self.remaining() < 4 {
            return Err(self.corrupted("truncated 32-bit integer"));
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_u64(&mut self) -> Result<u64, OtsError> {
        if self.remaining() < 8 {
            return Err(self.corrupted("truncated 64-bit integer"));
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], OtsError> {
        if self.remaining() < len {
            return Err(self.corrupted("length overruns the buffer"));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn peek_tag(&self, tag: Tag) -> bool {
        self.remaining() >= 1 && self.buf[self.pos] == tag.as_u8()
    }

    fn expect_tag(&mut self, tag: Tag, context: &str) -> Result<(), OtsError> {
        let b = self.read_u8()?;
        if b != tag.as_u8() {
            return Err(self.corrupted(context));
        }
        Ok(())
    }
}

fn read_header(cursor: &mut Cursor<'_>) -> Result<(), OtsError> {
    let header = cursor.read_u32()?;
    if header != HEADER {
        return Err(cursor.corrupted("bad frame header"));
    }
    Ok(())
}

fn read_variant(cursor: &mut Cursor<'_>) -> Result<VariantType, OtsError> {
    let b = cursor.read_u8()?;
    // only materialized variants may appear in a response
    let vt = match b {
        x if x == VariantType::Integer.as_u8() => VariantType::Integer,
        x if x == VariantType::Double.as_u8() => VariantType::Double,
        x if x == VariantType::Boolean.as_u8() => VariantType::Boolean,
        x if x == VariantType::String.as_u8() => VariantType::String,
        x if x == VariantType::Blob.as_u8() => VariantType::Blob,
        _ => return Err(cursor.corrupted("unknown cell-value variant")),
    };
    Ok(vt)
}

fn read_blob(cursor: &mut Cursor<'_>, checksum: &mut u8) -> Result<Vec<u8>, OtsError> {
    let len = cursor.read_u32()?;
    let bytes = cursor.read_bytes(len as usize)?;
    crc8_u32(checksum, len);
    crc8_bytes(checksum, bytes);
    Ok(bytes.to_vec())
}

fn read_name(cursor: &mut Cursor<'_>, checksum: &mut u8) -> Result<String, OtsError> {
    cursor.expect_tag(Tag::CellName, "expected a cell-name tag")?;
    let len = cursor.read_u32()?;
    let bytes = cursor.read_bytes(len as usize)?;
    crc8_bytes(checksum, bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|_| cursor.corrupted("cell name is not valid utf-8"))
}

fn read_pk_value(
    cursor: &mut Cursor<'_>,
    checksum: &mut u8,
) -> Result<PrimaryKeyValue, OtsError> {
    cursor.expect_tag(Tag::CellValue, "expected a cell-value tag")?;
    let _placeholder = cursor.read_u32()?;
    let vt = read_variant(cursor)?;
    match vt {
        VariantType::Integer => {
            let v = cursor.read_u64()?;
            crc8(checksum, VariantType::Integer.as_u8());
            crc8_u64(checksum, v);
            Ok(PrimaryKeyValue::Integer(v as i64))
        }
        VariantType::String => {
            crc8(checksum, VariantType::String.as_u8());
            let bytes = read_blob(cursor, checksum)?;
            let text = String::from_utf8(bytes)
                .map_err(|_| cursor.corrupted("string primary key is not valid utf-8"))?;
            Ok(PrimaryKeyValue::Str(text))
        }
        VariantType::Blob => {
            crc8(checksum, VariantType::Blob.as_u8());
            let bytes = read_blob(cursor, checksum)?;
            Ok(PrimaryKeyValue::Blob(bytes))
        }
        _ => Err(cursor.corrupted("variant is illegal in a row-key cell")),
    }
}

fn read_attr_value(
    cursor: &mut Cursor<'_>,
    checksum: &mut u8,
) -> Result<AttributeValue, OtsError> {
    cursor.expect_tag(Tag::CellValue, "expected a cell-value tag")?;
    let _placeholder = cursor.read_u32()?;
    let vt = read_variant(cursor)?;
    match vt {
        VariantType::Integer => {
            let v = cursor.read_u64()?;
            crc8(checksum, VariantType::Integer.as_u8());
            crc8_u64(checksum, v);
            Ok(AttributeValue::Integer(v as i64))
        }
        VariantType::String => {
            crc8(checksum, VariantType::String.as_u8());
            let bytes = read_blob(cursor, checksum)?;
            let text = String::from_utf8(bytes)
                .map_err(|_| cursor.corrupted("string attribute is not valid utf-8"))?;
            Ok(AttributeValue::Str(text))
        }
        VariantType::Blob => {
            crc8(checksum, VariantType::Blob.as_u8());
            let bytes = read_blob(cursor, checksum)?;
            Ok(AttributeValue::Blob(bytes))
        }
        VariantType::Double => {
            let bits = cursor.read_u64()?;
            crc8(checksum, VariantType::Double.as_u8());
            crc8_u64(checksum, bits);
            Ok(AttributeValue::Float(f64::from_bits(bits)))
        }
        VariantType::Boolean => {
            let b = cursor.read_u8()?;
            crc8(checksum, VariantType::Boolean.as_u8());
            crc8(checksum, if b != 0 { 1 } else { 0 });
            Ok(AttributeValue::Boolean(b != 0))
        }
        _ => Err(cursor.corrupted("variant is illegal in an attribute cell")),
    }
}

fn read_cell_checksum(cursor: &mut Cursor<'_>, computed: u8) -> Result<(), OtsError> {
    cursor.expect_tag(Tag::CellChecksum, "expected a cell-checksum tag")?;
    let oracle = cursor.read_u8()?;
    if oracle != computed {
        return Err(cursor.corrupted("cell checksum mismatch"));
    }
    Ok(())
}

fn read_pk_column(
    cursor: &mut Cursor<'_>,
    row_checksum: &mut u8,
) -> Result<PrimaryKeyColumn, OtsError> {
    cursor.expect_tag(Tag::Cell, "expected a cell tag")?;
    let mut cell_checksum = 0u8;
    let name = read_name(cursor, &mut cell_checksum)?;
    let value = read_pk_value(cursor, &mut cell_checksum)?;
    read_cell_checksum(cursor, cell_checksum)?;
    crc8(row_checksum, cell_checksum);
    Ok(PrimaryKeyColumn { name, value })
}

fn read_row_key(cursor: &mut Cursor<'_>, row_checksum: &mut u8) -> Result<PrimaryKey, OtsError> {
    cursor.expect_tag(Tag::RowKey, "expected a row-key tag")?;
    let mut key = PrimaryKey::default();
    while cursor.peek_tag(Tag::Cell) {
        key.columns.push(read_pk_column(cursor, row_checksum)?);
    }
    Ok(key)
}

fn read_attr(cursor: &mut Cursor<'_>, row_checksum: &mut u8) -> Result<Attribute, OtsError> {
    cursor.expect_tag(Tag::Cell, "expected a cell tag")?;
    let mut cell_checksum = 0u8;
    let name = read_name(cursor, &mut cell_checksum)?;
    let value = read_attr_value(cursor, &mut cell_checksum)?;
    let mut timestamp = None;
    if cursor.peek_tag(Tag::CellTimestamp) {
        cursor.expect_tag(Tag::CellTimestamp, "expected a cell-timestamp tag")?;
        let msec = cursor.read_u64()?;
        crc8_u64(&mut cell_checksum, msec);
        timestamp = Some(UtcTime::from_msec(msec as i64));
    }
    read_cell_checksum(cursor, cell_checksum)?;
    crc8(row_checksum, cell_checksum);
    Ok(Attribute { name, value, timestamp })
}

fn read_row(cursor: &mut Cursor<'_>) -> Result<Row, OtsError> {
    let mut row_checksum = 0u8;
    let primary_key = read_row_key(cursor, &mut row_checksum)?;
    let mut attributes = Vec::new();
    if cursor.peek_tag(Tag::RowData) {
        cursor.expect_tag(Tag::RowData, "expected a row-data tag")?;
        while cursor.peek_tag(Tag::Cell) {
            attributes.push(read_attr(cursor, &mut row_checksum)?);
        }
    }
    crc8(&mut row_checksum, 0); // responses never carry deleted rows
    cursor.expect_tag(Tag::RowChecksum, "expected a row-checksum tag")?;
    let oracle = cursor.read_u8()?;
    if oracle != row_checksum {
        return Err(cursor.corrupted("row checksum mismatch"));
    }
    Ok(Row { primary_key, attributes })
}

/// Decodes exactly one row; trailing bytes are an error.
pub fn decode_row(buf: &[u8]) -> Result<Row, OtsError> {
    let mut cursor = Cursor::new(buf);
    read_header(&mut cursor)?;
    let row = read_row(&mut cursor)?;
    if cursor.remaining() != 0 {
        return Err(cursor.corrupted("trailing bytes after the row"));
    }
    Ok(row)
}

/// Decodes a frame of zero or more rows, consuming the whole input.
pub fn decode_rows(buf: &[u8]) -> Result<Vec<Row>, OtsError> {
    let mut cursor = Cursor::new(buf);
    read_header(&mut cursor)?;
    let mut rows = Vec::new();
    while cursor.remaining() > 0 {
        rows.push(read_row(&mut cursor)?);
    }
    Ok(rows)
}
