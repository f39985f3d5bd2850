use std::time::Duration;
use widerow::types::{AttributeValue, CompareResult, PrimaryKey, PrimaryKeyColumn, PrimaryKeyValue};
use widerow::UtcTime;

#[test]
fn iso8601_rendering_matches_the_header_format() {
    assert_eq!(
        UtcTime::from_usec(1_451_700_245_678_901).to_iso8601(),
        "2016-01-02T02:04:05.678901Z"
    );
    assert_eq!(UtcTime::from_usec(0).to_iso8601(), "1970-01-01T00:00:00.000000Z");
}

#[test]
fn whole_millisecond_detection() {
    assert!(UtcTime::from_msec(17).is_whole_msec());
    assert!(!UtcTime::from_usec(17_001).is_whole_msec());
}

#[test]
fn checked_arithmetic_refuses_overflow() {
    let late = UtcTime::from_usec(i64::MAX - 10);
    assert!(late.checked_add(Duration::from_secs(1)).is_none());
    let t = UtcTime::from_sec(100);
    assert_eq!(
        t.checked_add(Duration::from_millis(500)).unwrap().to_msec(),
        100_500
    );
    assert_eq!(t.checked_sub(Duration::from_secs(1)).unwrap().to_sec(), 99);
}

#[test]
fn primary_key_values_compare_within_like_categories() {
    use PrimaryKeyValue::*;
    assert_eq!(Integer(1).compare(&Integer(2)), CompareResult::Smaller);
    assert_eq!(
        Str("b".into()).compare(&Str("a".into())),
        CompareResult::Larger
    );
    assert_eq!(
        Blob(vec![1, 2]).compare(&Blob(vec![1, 2])),
        CompareResult::Equivalent
    );
}

#[test]
fn infinities_order_against_real_values_only() {
    use PrimaryKeyValue::*;
    assert_eq!(InfMin.compare(&Integer(0)), CompareResult::Smaller);
    assert_eq!(InfMax.compare(&Integer(0)), CompareResult::Larger);
    assert_eq!(Integer(0).compare(&InfMax), CompareResult::Smaller);
    assert_eq!(InfMax.compare(&InfMax), CompareResult::Uncomparable);
    assert_eq!(InfMin.compare(&InfMax), CompareResult::Uncomparable);
}

#[test]
fn auto_increment_and_cross_type_are_uncomparable() {
    use PrimaryKeyValue::*;
    assert_eq!(AutoIncrement.compare(&Integer(0)), CompareResult::Uncomparable);
    assert_eq!(AutoIncrement.compare(&AutoIncrement), CompareResult::Uncomparable);
    assert_eq!(Integer(0).compare(&Str("0".into())), CompareResult::Uncomparable);
}

#[test]
fn attribute_values_with_nan_are_uncomparable() {
    use AttributeValue::*;
    assert_eq!(Float(1.0).compare(&Float(2.0)), CompareResult::Smaller);
    assert_eq!(Float(f64::NAN).compare(&Float(1.0)), CompareResult::Uncomparable);
    assert_eq!(Boolean(false).compare(&Boolean(true)), CompareResult::Smaller);
    assert_eq!(Integer(1).compare(&Str("1".into())), CompareResult::Uncomparable);
}

#[test]
fn primary_keys_compare_column_by_column() {
    let a = PrimaryKey::new(vec![
        PrimaryKeyColumn::new("p0", PrimaryKeyValue::Integer(1)),
        PrimaryKeyColumn::new("p1", PrimaryKeyValue::Str("a".into())),
    ]);
    let mut b = a.clone();
    assert_eq!(a.compare(&b), CompareResult::Equivalent);
    b.columns[1].value = PrimaryKeyValue::Str("b".into());
    assert_eq!(a.compare(&b), CompareResult::Smaller);
    let short = PrimaryKey::new(vec![PrimaryKeyColumn::new(
        "p0",
        PrimaryKeyValue::Integer(1),
    )]);
    assert_eq!(a.compare(&short), CompareResult::Uncomparable);
}
