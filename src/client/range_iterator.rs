//! Lazy row sequence over paged `GetRange` calls.

use crate::client::core::SyncClient;
use crate::error::OtsError;
use crate::types::criterion::RangeQueryCriterion;
use crate::types::request::{GetRangeRequest, GetRangeResponse};
use crate::types::row::{CapacityUnit, PrimaryKey, Row};
use std::collections::VecDeque;

/// The server never returns more rows than this in one page.
const SERVER_PAGE_CAP: i64 = 5000;

/// Whatever can serve one page of a range. `SyncClient` is the production
/// implementation; tests substitute deterministic mocks.
pub trait RangeReader {
    fn get_range(&self, request: GetRangeRequest) -> Result<GetRangeResponse, OtsError>;
}

impl RangeReader for SyncClient {
    fn get_range(&self, request: GetRangeRequest) -> Result<GetRangeResponse, OtsError> {
        SyncClient::get_range(self, request)
    }
}

/// Walks a range page by page, honoring the criterion's overall `limit`,
/// accumulating consumed capacity, and exposing the resume point.
///
/// A failed [`RangeIterator::move_next`] propagates the error and leaves the
/// iterator invalid but still queryable, so a caller can inspect what had
/// been consumed and where to resume.
pub struct RangeIterator<'a> {
    reader: &'a dyn RangeReader,
    criterion: RangeQueryCriterion,
    cursor: PrimaryKey,
    buffer: VecDeque<Row>,
    current: Option<Row>,
    remaining: Option<i64>,
    consumed: CapacityUnit,
    next_start: Option<PrimaryKey>,
    fetched_once: bool,
    exhausted: bool,
}

impl<'a> RangeIterator<'a> {
    pub fn new(reader: &'a dyn RangeReader, criterion: RangeQueryCriterion) -> Self {
        let cursor = criterion.inclusive_start.clone();
        let remaining = criterion.limit;
        Self {
            reader,
            criterion,
            cursor,
            buffer: VecDeque::new(),
            current: None,
            remaining,
            consumed: CapacityUnit::default(),
            next_start: None,
            fetched_once: false,
            exhausted: false,
        }
    }

    /// Advances to the next row, fetching pages as needed. After it returns
    /// `Ok`, [`RangeIterator::valid`] tells whether a row is positioned.
    pub fn move_next(&mut self) -> Result<(), OtsError> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.current = Some(row);
                return Ok(());
            }
            if self.exhausted
                || matches!(self.remaining, Some(remaining) if remaining <= 0)
                || (self.fetched_once && self.next_start.is_none())
            {
                self.exhausted = true;
                self.current = None;
                return Ok(());
            }
            self.fetch_page()?;
        }
    }

    fn fetch_page(&mut self) -> Result<(), OtsError> {
        let mut criterion = self.criterion.clone();
        criterion.inclusive_start = self.cursor.clone();
        criterion.limit = self.remaining.map(|remaining| remaining.min(SERVER_PAGE_CAP));
        let response = match self.reader.get_range(GetRangeRequest {
            query_criterion: criterion,
        }) {
            Ok(response) => response,
            Err(err) => {
                self.current = None;
                return Err(err);
            }
        };
        self.fetched_once = true;
        self.consumed.merge(&response.consumed_capacity);
        let mut rows = response.rows;
        if let Some(remaining) = self.remaining.as_mut() {
            // never yield past the caller's limit, whatever the server sent
            rows.truncate((*remaining).max(0) as usize);
            *remaining -= rows.len() as i64;
        }
        self.buffer.extend(rows);
        self.next_start = response.next_start;
        if let Some(next) = &self.next_start {
            self.cursor = next.clone();
        }
        Ok(())
    }

    /// Whether the last `move_next` positioned a row.
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// The positioned row, when valid.
    pub fn get(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// Capacity consumed by every page fetched so far.
    pub fn consumed_capacity(&self) -> CapacityUnit {
        self.consumed
    }

    /// The last continuation the server handed back; where a fresh criterion
    /// should resume.
    pub fn next_start(&self) -> Option<&PrimaryKey> {
        self.next_start.as_ref()
    }
}
