use chrono::{Days, NaiveDate};

use crate::limits::MAX_QUERY_WINDOW_DAYS;
use crate::model::*;

use super::conflict::overlapping;
use super::EngineError;

/// Range queries refuse windows wider than `MAX_QUERY_WINDOW_DAYS`.
pub(crate) fn check_window(window: &DateSpan) -> Result<(), EngineError> {
    if window.nights() > MAX_QUERY_WINDOW_DAYS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(())
}

/// `base` minus `to_remove`. Both sorted by start; `to_remove` may overlap itself.
pub fn subtract_intervals(base: &[DateSpan], to_remove: &[DateSpan]) -> Vec<DateSpan> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(DateSpan::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(DateSpan::new(current_start, current_end));
        }
    }

    result
}

/// Vacant gaps inside `window`. Every night in a returned span is free.
pub fn vacant_spans(
    intervals: &[Interval],
    window: &DateSpan,
) -> Result<Vec<DateSpan>, EngineError> {
    check_window(window)?;
    let occupied: Vec<DateSpan> = overlapping(intervals, window).map(|i| i.span).collect();
    Ok(subtract_intervals(std::slice::from_ref(window), &occupied))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupancy {
    pub total_nights: i64,
    pub guest_nights: i64,
    pub maintenance_nights: i64,
}

impl Occupancy {
    pub fn vacant_nights(&self) -> i64 {
        self.total_nights - self.guest_nights - self.maintenance_nights
    }

    /// Guest nights over nights not blocked for maintenance. 0 when nothing is rentable.
    pub fn rate(&self) -> f64 {
        let rentable = self.total_nights - self.maintenance_nights;
        if rentable <= 0 {
            0.0
        } else {
            self.guest_nights as f64 / rentable as f64
        }
    }
}

pub fn occupancy(intervals: &[Interval], window: &DateSpan) -> Result<Occupancy, EngineError> {
    check_window(window)?;
    let mut occ = Occupancy {
        total_nights: window.nights(),
        guest_nights: 0,
        maintenance_nights: 0,
    };
    for interval in overlapping(intervals, window) {
        let Some(clipped) = interval.span.intersect(window) else {
            continue;
        };
        match interval.kind {
            IntervalKind::Guest(_) => occ.guest_nights += clipped.nights(),
            IntervalKind::Maintenance { .. } => occ.maintenance_nights += clipped.nights(),
        }
    }
    Ok(occ)
}

/// Earliest span of `nights` nights starting on or after `from` that touches no interval.
/// The search looks no further than `MAX_QUERY_WINDOW_DAYS` past `from`.
pub fn next_available(intervals: &[Interval], from: NaiveDate, nights: u32) -> Option<DateSpan> {
    if nights == 0 {
        return None;
    }
    let horizon = from.checked_add_days(Days::new(MAX_QUERY_WINDOW_DAYS as u64))?;
    let mut start = from;
    // Intervals are sorted by start and disjoint, so one forward pass suffices.
    for interval in intervals.iter().filter(|i| i.span.end > from) {
        let end = start.checked_add_days(Days::new(u64::from(nights)))?;
        if end <= interval.span.start {
            return (end <= horizon).then(|| DateSpan::new(start, end));
        }
        start = start.max(interval.span.end);
    }
    let end = start.checked_add_days(Days::new(u64::from(nights)))?;
    (end <= horizon).then(|| DateSpan::new(start, end))
}
