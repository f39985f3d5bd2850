use proptest::prelude::*;
use widerow::plainbuffer::{decode_row, decode_rows, encode_delete, encode_put, encode_update};
use widerow::security::{crc8, crc8_bytes, CRC8_TABLE};
use widerow::types::{
    Attribute, AttributeValue, PrimaryKey, PrimaryKeyColumn, PrimaryKeyValue, RowDeleteChange,
    RowPutChange, RowUpdate, RowUpdateChange,
};
use widerow::{ErrorCode, UtcTime};

fn pk(columns: Vec<(&str, PrimaryKeyValue)>) -> PrimaryKey {
    PrimaryKey::new(
        columns
            .into_iter()
            .map(|(name, value)| PrimaryKeyColumn::new(name, value))
            .collect(),
    )
}

fn sample_put() -> RowPutChange {
    let mut change = RowPutChange::new("t", pk(vec![("pk", PrimaryKeyValue::Integer(1))]));
    change
        .attributes
        .push(Attribute::new("attr", AttributeValue::Str("a".to_string())));
    change
}

#[test]
fn crc8_table_matches_atm_polynomial() {
    assert_eq!(&CRC8_TABLE[..8], &[0x00, 0x07, 0x0e, 0x09, 0x1c, 0x1b, 0x12, 0x15]);
    let mut acc = 0u8;
    crc8_bytes(&mut acc, b"abc");
    assert_eq!(acc, 0x5f);
    let mut acc = 0u8;
    for b in 0u8..10 {
        crc8(&mut acc, b);
    }
    assert_eq!(acc, 0x85);
}

#[test]
fn golden_frame_for_simple_put() {
    let frame = encode_put(&sample_put()).unwrap();
    let expected = "7500000001030402000000706b05090000000001000000000000000a4c0203040400\
                    00006174747205060000000301000000610a020956";
    let hex: String = frame.iter().map(|b| format!("{b:02x}")).collect();
    assert_eq!(hex, expected);
}

#[test]
fn roundtrip_all_value_kinds() {
    let mut change = RowPutChange::new(
        "t",
        pk(vec![
            ("a", PrimaryKeyValue::Integer(-7)),
            ("b", PrimaryKeyValue::Str("pk-мир".to_string())),
            ("c", PrimaryKeyValue::Blob(vec![0x00, 0xff, 0x7f])),
        ]),
    );
    change.attributes = vec![
        Attribute::new("int", AttributeValue::Integer(i64::MIN)),
        Attribute::new("str", AttributeValue::Str(String::new())),
        Attribute::new("blob", AttributeValue::Blob(vec![1, 2, 3])),
        Attribute::new("yes", AttributeValue::Boolean(true)),
        Attribute::new("no", AttributeValue::Boolean(false)),
        Attribute::new("pi", AttributeValue::Float(3.25)),
        Attribute::new("stamped", AttributeValue::Integer(5))
            .with_timestamp(UtcTime::from_msec(1_234_567)),
    ];
    let frame = encode_put(&change).unwrap();
    let row = decode_row(&frame).unwrap();
    assert_eq!(row.primary_key, change.primary_key);
    assert_eq!(row.attributes, change.attributes);
}

#[test]
fn bare_key_frame_decodes_as_attributeless_row() {
    let key = pk(vec![("pk", PrimaryKeyValue::Str("x".to_string()))]);
    let frame = widerow::plainbuffer::encode_primary_key(&key).unwrap();
    let row = decode_row(&frame).unwrap();
    assert_eq!(row.primary_key, key);
    assert!(row.attributes.is_empty());
}

#[test]
fn delete_change_carries_row_delete_marker() {
    let change = RowDeleteChange::new("t", pk(vec![("pk", PrimaryKeyValue::Integer(0))]));
    let frame = encode_delete(&change).unwrap();
    // marker tag right before the trailing row-checksum tag and byte
    assert_eq!(frame[frame.len() - 3], 0x8);
    assert_eq!(frame[frame.len() - 2], 0x9);
    // a deleted row never comes back in a response, so the decoder rejects it
    let err = decode_row(&frame).unwrap_err();
    assert_eq!(err.code, ErrorCode::CorruptedResponse);
}

#[test]
fn update_change_encodes_delete_cells() {
    let mut change = RowUpdateChange::new("t", pk(vec![("pk", PrimaryKeyValue::Integer(0))]));
    change.updates = vec![
        RowUpdate::put("v", AttributeValue::Integer(42)),
        RowUpdate::delete_one_version("old", UtcTime::from_msec(1_000)),
        RowUpdate::delete_all_versions("gone"),
    ];
    let frame = encode_update(&change).unwrap();
    // cell-type bytes of both delete flavors appear after a CellType tag
    let has = |marker: u8| {
        frame
            .windows(2)
            .any(|pair| pair[0] == 0x6 && pair[1] == marker)
    };
    assert!(has(0x3), "delete-one-version marker missing");
    assert!(has(0x1), "delete-all-versions marker missing");
}

#[test]
fn multi_row_frame_roundtrips_and_rejects_trailing_bytes() {
    let change = sample_put();
    let mut frame = encode_put(&change).unwrap();
    // a second row shares the frame header; append its body only
    let second = encode_put(&change).unwrap();
    frame.extend_from_slice(&second[4..]);
    let rows = decode_rows(&frame).unwrap();
    assert_eq!(rows.len(), 2);

    frame.push(0x00);
    let err = decode_rows(&frame).unwrap_err();
    assert_eq!(err.code, ErrorCode::CorruptedResponse);
}

#[test]
fn corrupting_the_attribute_checksum_is_detected() {
    let mut frame = encode_put(&sample_put()).unwrap();
    // the attribute's cell-checksum byte sits right before the trailing
    // row-checksum tag and byte
    let idx = frame.len() - 3;
    frame[idx] ^= 0xff;
    let err = decode_row(&frame).unwrap_err();
    assert_eq!(err.code, ErrorCode::CorruptedResponse);
}

#[test]
fn every_covered_byte_flip_is_detected() {
    let frame = encode_put(&sample_put()).unwrap();
    // the 4-byte prefixes ahead of each variant tag are read and discarded,
    // so flips there are invisible by design
    let placeholders = [14..18usize, 41..45usize];
    for idx in 0..frame.len() {
        if placeholders.iter().any(|range| range.contains(&idx)) {
            continue;
        }
        let mut copy = frame.clone();
        copy[idx] ^= 0xff;
        let result = decode_row(&copy);
        assert!(
            result.is_err(),
            "flip at offset {idx} went undetected"
        );
        assert_eq!(result.unwrap_err().code, ErrorCode::CorruptedResponse);
    }
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_rows(
        key_int in any::<i64>(),
        key_str in "[a-z]{0,12}",
        attr_blob in proptest::collection::vec(any::<u8>(), 0..64),
        attr_int in any::<i64>(),
        flag in any::<bool>(),
        fp in -1.0e12f64..1.0e12f64,
        ts_msec in 0i64..4_102_444_800_000i64,
    ) {
        let mut change = RowPutChange::new(
            "t",
            pk(vec![
                ("p0", PrimaryKeyValue::Integer(key_int)),
                ("p1", PrimaryKeyValue::Str(key_str)),
            ]),
        );
        change.attributes = vec![
            Attribute::new("blob", AttributeValue::Blob(attr_blob)),
            Attribute::new("int", AttributeValue::Integer(attr_int)),
            Attribute::new("flag", AttributeValue::Boolean(flag)),
            Attribute::new("fp", AttributeValue::Float(fp)),
            Attribute::new("at", AttributeValue::Integer(0))
                .with_timestamp(UtcTime::from_msec(ts_msec)),
        ];
        let frame = encode_put(&change).unwrap();
        let row = decode_row(&frame).unwrap();
        prop_assert_eq!(row.primary_key, change.primary_key);
        prop_assert_eq!(row.attributes, change.attributes);
    }
}
