/// A slice of the export window, both ends inclusive, in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubInterval {
    pub start: i64,
    pub end: i64,
}

impl SubInterval {
    pub fn span(&self) -> i64 {
        self.end - self.start
    }
}

/// Splits `[start_ts, end_ts]` into consecutive slices spanning at most `max_span` ms.
///
/// Each slice after the first starts one millisecond after the previous one
/// ended. Returns nothing when `start_ts >= end_ts` or `max_span <= 0`.
pub fn partition(start_ts: i64, end_ts: i64, max_span: i64) -> Vec<SubInterval> {
    let mut intervals = Vec::new();
    if max_span <= 0 {
        return intervals;
    }

    let mut cursor = start_ts;
    while cursor < end_ts {
        let end = cursor.saturating_add(max_span).min(end_ts);
        intervals.push(SubInterval { start: cursor, end });
        cursor = end.saturating_add(1);
    }
    intervals
}
