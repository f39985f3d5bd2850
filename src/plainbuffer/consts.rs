/// Leading magic of every plainbuffer frame, 4 bytes little-endian.
pub const HEADER: u32 = 0x75;

/// Section tags, one byte each. The numeric values are fixed by the wire
/// protocol and must match the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    None = 0x0,
    RowKey = 0x1,
    RowData = 0x2,
    Cell = 0x3,
    CellName = 0x4,
    CellValue = 0x5,
    CellType = 0x6,
    CellTimestamp = 0x7,
    RowDeleteMarker = 0x8,
    RowChecksum = 0x9,
    CellChecksum = 0xa,
}

impl Tag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Variant tags inside a `CellValue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VariantType {
    Integer = 0x0,
    Double = 0x1,
    Boolean = 0x2,
    String = 0x3,
    Null = 0x6,
    Blob = 0x7,
    InfMin = 0x9,
    InfMax = 0xa,
    AutoIncrement = 0xb,
}

impl VariantType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Cell-type bytes used by update-change cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CellDeleteMarker {
    DeleteAllVersions = 0x1,
    DeleteOneVersion = 0x3,
}

impl CellDeleteMarker {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
