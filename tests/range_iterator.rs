use std::cell::RefCell;
use std::collections::VecDeque;
use widerow::types::*;
use widerow::{ErrorCode, OtsError, RangeIterator, RangeReader};

fn pk(value: i64) -> PrimaryKey {
    PrimaryKey::new(vec![PrimaryKeyColumn::new(
        "pk",
        PrimaryKeyValue::Integer(value),
    )])
}

fn row(value: i64) -> Row {
    Row {
        primary_key: pk(value),
        attributes: Vec::new(),
    }
}

fn page(rows: Vec<Row>, read_cu: Option<i64>, next_start: Option<PrimaryKey>) -> GetRangeResponse {
    GetRangeResponse {
        consumed_capacity: CapacityUnit {
            read: read_cu,
            write: None,
        },
        rows,
        next_start,
        ..Default::default()
    }
}

struct ScriptedReader {
    pages: RefCell<VecDeque<Result<GetRangeResponse, OtsError>>>,
    requests: RefCell<Vec<GetRangeRequest>>,
}

impl ScriptedReader {
    fn new(pages: Vec<Result<GetRangeResponse, OtsError>>) -> Self {
        Self {
            pages: RefCell::new(pages.into()),
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl RangeReader for ScriptedReader {
    fn get_range(&self, request: GetRangeRequest) -> Result<GetRangeResponse, OtsError> {
        self.requests.borrow_mut().push(request);
        self.pages
            .borrow_mut()
            .pop_front()
            .expect("iterator asked for more pages than scripted")
    }
}

fn criterion() -> RangeQueryCriterion {
    RangeQueryCriterion {
        table: "t".to_string(),
        inclusive_start: PrimaryKey::new(vec![PrimaryKeyColumn::new(
            "pk",
            PrimaryKeyValue::InfMin,
        )]),
        exclusive_end: PrimaryKey::new(vec![PrimaryKeyColumn::new(
            "pk",
            PrimaryKeyValue::InfMax,
        )]),
        ..Default::default()
    }
}

fn collect(iter: &mut RangeIterator<'_>) -> Vec<Row> {
    let mut rows = Vec::new();
    loop {
        iter.move_next().unwrap();
        if !iter.valid() {
            return rows;
        }
        rows.push(iter.get().unwrap().clone());
    }
}

#[test]
fn empty_range_yields_nothing() {
    let reader = ScriptedReader::new(vec![Ok(page(vec![], None, None))]);
    let mut iter = RangeIterator::new(&reader, criterion());
    let rows = collect(&mut iter);
    assert!(rows.is_empty());
    assert_eq!(iter.consumed_capacity().read, None);
    assert_eq!(iter.consumed_capacity().write, None);
}

#[test]
fn single_page_yields_its_row_and_capacity() {
    let reader = ScriptedReader::new(vec![Ok(page(vec![row(0)], Some(12), None))]);
    let mut iter = RangeIterator::new(&reader, criterion());
    let rows = collect(&mut iter);
    assert_eq!(rows, vec![row(0)]);
    assert_eq!(iter.consumed_capacity().read, Some(12));
    assert_eq!(iter.consumed_capacity().write, None);
}

#[test]
fn continuation_pages_concatenate_without_duplicates() {
    let reader = ScriptedReader::new(vec![
        Ok(page(vec![row(0)], Some(1), Some(pk(1)))),
        Ok(page(vec![row(1)], Some(2), None)),
    ]);
    let mut iter = RangeIterator::new(&reader, criterion());
    let rows = collect(&mut iter);
    assert_eq!(rows, vec![row(0), row(1)]);
    assert_eq!(iter.consumed_capacity().read, Some(3));
    // the second request resumed from the first page's continuation
    let requests = reader.requests.borrow();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].query_criterion.inclusive_start, pk(1));
}

#[test]
fn caller_limit_shrinks_page_requests_and_stops_early() {
    let reader = ScriptedReader::new(vec![
        Ok(page(vec![row(0)], None, Some(pk(1)))),
        Ok(page(vec![row(1)], None, Some(pk(2)))),
    ]);
    let mut query = criterion();
    query.limit = Some(2);
    let mut iter = RangeIterator::new(&reader, query);
    let rows = collect(&mut iter);
    assert_eq!(rows, vec![row(0), row(1)]);
    // the second page asked only for the remaining row
    let requests = reader.requests.borrow();
    assert_eq!(requests[0].query_criterion.limit, Some(2));
    assert_eq!(requests[1].query_criterion.limit, Some(1));
    // the iterator exposes where a fresh scan would resume
    assert_eq!(iter.next_start(), Some(&pk(2)));
}

#[test]
fn server_rows_beyond_the_limit_are_dropped() {
    let reader = ScriptedReader::new(vec![Ok(page(
        vec![row(0), row(1), row(2)],
        None,
        Some(pk(3)),
    ))]);
    let mut query = criterion();
    query.limit = Some(2);
    let mut iter = RangeIterator::new(&reader, query);
    let rows = collect(&mut iter);
    assert_eq!(rows, vec![row(0), row(1)]);
}

#[test]
fn errors_propagate_and_leave_the_iterator_queryable() {
    let reader = ScriptedReader::new(vec![
        Ok(page(vec![row(0)], Some(5), Some(pk(1)))),
        Err(OtsError::new(ErrorCode::OtsServerBusy, "busy")),
    ]);
    let mut iter = RangeIterator::new(&reader, criterion());
    iter.move_next().unwrap();
    assert!(iter.valid());
    let err = iter.move_next().unwrap_err();
    assert_eq!(err.code, ErrorCode::OtsServerBusy);
    assert!(!iter.valid());
    // what was consumed so far is still visible
    assert_eq!(iter.consumed_capacity().read, Some(5));
    assert_eq!(iter.next_start(), Some(&pk(1)));
}
