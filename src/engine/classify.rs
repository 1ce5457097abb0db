use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::availability::check_window;
use super::EngineError;

/// Resolve the status of `date`. Rules, first match wins:
/// 1. strictly inside some interval → `FullyBooked`
/// 2. one interval checks in, a different one checks out → `Turnaround`
/// 3. an interval checks in → `CheckIn`
/// 4. an interval checks out → `CheckOut`
/// 5. `Vacant`
pub fn classify(date: NaiveDate, intervals: &[Interval]) -> DayClassification {
    classify_excluding(date, intervals, None)
}

/// Same as [`classify`], ignoring the interval being edited.
pub fn classify_excluding(
    date: NaiveDate,
    intervals: &[Interval],
    exclude: Option<Ulid>,
) -> DayClassification {
    let mut incoming: Option<&Interval> = None;
    let mut outgoing: Option<&Interval> = None;

    for interval in intervals.iter().filter(|i| Some(i.id) != exclude) {
        // No-overlap means at most one interval can hold the date in its interior.
        if interval.span.contains_interior(date) {
            return DayClassification::FullyBooked(interval.into());
        }
        if interval.span.start == date && incoming.is_none() {
            incoming = Some(interval);
        }
        if interval.span.end == date && outgoing.is_none() {
            outgoing = Some(interval);
        }
    }

    match (outgoing, incoming) {
        (Some(out), Some(inc)) if out.id != inc.id => DayClassification::Turnaround {
            outgoing: out.into(),
            incoming: inc.into(),
        },
        (_, Some(inc)) => DayClassification::CheckIn(inc.into()),
        (Some(out), None) => DayClassification::CheckOut(out.into()),
        (None, None) => DayClassification::Vacant,
    }
}

/// Classify every day in `span`.
pub fn classify_span(
    span: &DateSpan,
    intervals: &[Interval],
    exclude: Option<Ulid>,
) -> Result<Vec<(NaiveDate, DayClassification)>, EngineError> {
    check_window(span)?;
    Ok(span
        .days()
        .map(|day| (day, classify_excluding(day, intervals, exclude)))
        .collect())
}

/// A new stay may start on a vacant day or on another stay's check-out day.
pub fn selectable_as_start(c: &DayClassification) -> bool {
    matches!(c, DayClassification::Vacant | DayClassification::CheckOut(_))
}

/// A new stay may end on a vacant day, inside nothing, or on another stay's
/// check-in day. Interior days are caught later by the blocked-range check.
pub fn selectable_as_end(c: &DayClassification) -> bool {
    !matches!(
        c,
        DayClassification::CheckOut(_) | DayClassification::Turnaround { .. }
    )
}
