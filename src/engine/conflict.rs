use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::validate::validate_dates;
use super::EngineError;

/// Half-open overlap: back-to-back spans sharing a boundary day do not overlap.
pub fn overlaps(a: &DateSpan, b: &DateSpan) -> bool {
    a.overlaps(b)
}

/// Intervals (sorted by check-in) whose span overlaps `query`.
/// Binary search skips everything starting at or after `query.end`.
pub fn overlapping<'a>(
    sorted: &'a [Interval],
    query: &DateSpan,
) -> impl Iterator<Item = &'a Interval> + use<'a> {
    let right_bound = sorted.partition_point(|i| i.span.start < query.end);
    let query_start = query.start;
    sorted[..right_bound]
        .iter()
        .filter(move |i| i.span.end > query_start)
}

/// Every interval in `existing` other than `exclude` that overlaps `candidate`.
/// Empty means the candidate is legal.
pub fn find_conflicts<'a>(
    candidate: &DateSpan,
    existing: &'a [Interval],
    exclude: Option<Ulid>,
) -> Vec<&'a Interval> {
    overlapping(existing, candidate)
        .filter(|i| Some(i.id) != exclude)
        .collect()
}

/// First interval whose check-in falls strictly inside `(start, end)`.
/// Used when picking a check-out, so a range cannot jump over an existing stay.
pub fn first_blocked_in_range<'a>(
    start_exclusive: NaiveDate,
    end_exclusive: NaiveDate,
    existing: &'a [Interval],
    exclude: Option<Ulid>,
) -> Option<&'a Interval> {
    existing
        .iter()
        .filter(|i| Some(i.id) != exclude)
        .find(|i| start_exclusive < i.span.start && i.span.start < end_exclusive)
}

pub fn range_contains_blocked_date(
    start_exclusive: NaiveDate,
    end_exclusive: NaiveDate,
    existing: &[Interval],
) -> bool {
    first_blocked_in_range(start_exclusive, end_exclusive, existing, None).is_some()
}

/// Conflict check against the store contents, ignoring `exclude` (the interval being edited).
pub(crate) fn check_no_conflict(
    existing: &[Interval],
    span: &DateSpan,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    let conflicts = find_conflicts(span, existing, exclude);
    if conflicts.is_empty() {
        return Ok(());
    }
    metrics::counter!(crate::observability::CONFLICTS_TOTAL).increment(1);
    let ids: Vec<Ulid> = conflicts.iter().map(|i| i.id).collect();
    tracing::debug!("{span} conflicts with {} interval(s)", ids.len());
    Err(EngineError::Conflict(ids))
}

/// Date validation followed by the overlap check. A zero-length range is
/// rejected before existing contents are looked at.
pub fn check_candidate(
    check_in: NaiveDate,
    check_out: NaiveDate,
    existing: &[Interval],
    exclude: Option<Ulid>,
) -> Result<DateSpan, EngineError> {
    let span = validate_dates(check_in, check_out)?;
    check_no_conflict(existing, &span, exclude)?;
    Ok(span)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::engine::ValidationError;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn stay(start: &str, end: &str) -> Interval {
        Interval {
            id: Ulid::new(),
            span: DateSpan::new(d(start), d(end)),
            kind: IntervalKind::Maintenance { expense: 0.0 },
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn back_to_back_is_not_overlap() {
        let a = DateSpan::new(d("2026-01-01"), d("2026-01-05"));
        let b = DateSpan::new(d("2026-01-05"), d("2026-01-08"));
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));
    }

    #[test]
    fn find_conflicts_reports_all_blockers() {
        let existing = vec![stay("2026-01-01", "2026-01-05"), stay("2026-01-05", "2026-01-08")];
        let candidate = DateSpan::new(d("2026-01-04"), d("2026-01-06"));
        let hits = find_conflicts(&candidate, &existing, None);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn find_conflicts_excludes_self() {
        let existing = vec![stay("2026-01-01", "2026-01-05")];
        let moved = DateSpan::new(d("2026-01-02"), d("2026-01-06"));
        assert!(find_conflicts(&moved, &existing, Some(existing[0].id)).is_empty());
    }

    #[test]
    fn overlapping_skips_past_and_future() {
        let existing = vec![
            stay("2026-01-01", "2026-01-03"),
            stay("2026-01-10", "2026-01-12"),
            stay("2026-02-01", "2026-02-05"),
        ];
        let query = DateSpan::new(d("2026-01-03"), d("2026-01-11"));
        let hits: Vec<_> = overlapping(&existing, &query).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, existing[1].id);
    }

    #[test]
    fn blocked_date_strictly_inside() {
        let existing = vec![stay("2026-01-14", "2026-01-17")];
        assert!(range_contains_blocked_date(d("2026-01-03"), d("2026-01-20"), &existing));
        // checking out on the other stay's check-in day is a turnaround
        assert!(!range_contains_blocked_date(d("2026-01-03"), d("2026-01-14"), &existing));
        assert!(!range_contains_blocked_date(d("2026-01-17"), d("2026-01-20"), &existing));
    }

    #[test]
    fn zero_length_candidate_rejected_even_when_empty() {
        let err = check_candidate(d("2026-01-01"), d("2026-01-01"), &[], None).unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation(ValidationError::ZeroLength(d("2026-01-01")))
        );
    }

    #[test]
    fn candidate_conflict_names_blocker() {
        let existing = vec![stay("2026-01-01", "2026-01-05")];
        let err = check_candidate(d("2026-01-04"), d("2026-01-06"), &existing, None).unwrap_err();
        assert_eq!(err, EngineError::Conflict(vec![existing[0].id]));
    }
}
