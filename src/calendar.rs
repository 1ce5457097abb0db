//! Two-click check-in / check-out picker for one property.
//!
//! The picker only gates what the user can click. `IntervalStore::add` and
//! `update` repeat the overlap check when the selection is committed, so a
//! stay booked elsewhere between confirm and commit is still caught.

use chrono::NaiveDate;
use tracing::debug;
use ulid::Ulid;

use crate::engine::{
    classify_excluding, first_blocked_in_range, selectable_as_end, selectable_as_start,
};
use crate::model::*;
use crate::observability::SELECTION_REJECTIONS_TOTAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Idle,
    CheckInChosen {
        check_in: NaiveDate,
    },
    RangeChosen {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The chosen check-out would jump over this stay.
    DoubleBooking { blocking: Ulid },
    /// Confirm before both dates were picked.
    NotReady,
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::DoubleBooking { blocking } => {
                write!(f, "double booking: range crosses reservation {blocking}")
            }
            SelectionError::NotReady => write!(f, "pick a check-in and a check-out date first"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Result of a single date click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Date not selectable in the current state; nothing changed.
    Ignored,
    CheckInSet(NaiveDate),
    RangeSet(DateSpan),
    /// Selection kept as it was; the error is also held in `error()`.
    Rejected(SelectionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSignal {
    Confirmed(DateSpan),
    Cancelled,
}

/// One cell of the visible month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: DayClassification,
    pub past: bool,
    pub selected: bool,
    pub selectable_start: bool,
    pub selectable_end: bool,
}

#[derive(Debug, Clone)]
pub struct AvailabilityCalendar {
    today: NaiveDate,
    month: YearMonth,
    selection: Selection,
    error: Option<SelectionError>,
    /// Interval being edited; invisible to classification and blocking checks.
    editing: Option<Ulid>,
}

impl AvailabilityCalendar {
    pub fn new(today: NaiveDate, month: YearMonth) -> Self {
        Self {
            today,
            month,
            selection: Selection::Idle,
            error: None,
            editing: None,
        }
    }

    /// Open the picker on an existing interval, its range pre-selected.
    pub fn editing(today: NaiveDate, interval: &Interval) -> Self {
        Self {
            today,
            month: YearMonth::of(interval.check_in()),
            selection: Selection::RangeChosen {
                check_in: interval.check_in(),
                check_out: interval.check_out(),
            },
            error: None,
            editing: Some(interval.id),
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn error(&self) -> Option<&SelectionError> {
        self.error.as_ref()
    }

    pub fn editing_id(&self) -> Option<Ulid> {
        self.editing
    }

    pub fn next_month(&mut self) {
        self.month = self.month.next();
    }

    pub fn prev_month(&mut self) {
        self.month = self.month.prev();
    }

    pub fn nights(&self) -> Option<i64> {
        match self.selection {
            Selection::RangeChosen { check_in, check_out } => {
                Some((check_out - check_in).num_days())
            }
            _ => None,
        }
    }

    fn status(&self, date: NaiveDate, intervals: &[Interval]) -> DayClassification {
        classify_excluding(date, intervals, self.editing)
    }

    fn can_start(&self, date: NaiveDate, intervals: &[Interval]) -> bool {
        selectable_as_start(&self.status(date, intervals))
    }

    fn start_at(&mut self, date: NaiveDate) -> ClickOutcome {
        self.selection = Selection::CheckInChosen { check_in: date };
        self.error = None;
        ClickOutcome::CheckInSet(date)
    }

    /// Feed a click on `date`. `intervals` are the property's current intervals.
    pub fn click_date(&mut self, date: NaiveDate, intervals: &[Interval]) -> ClickOutcome {
        if date < self.today {
            return ClickOutcome::Ignored;
        }
        match self.selection {
            Selection::Idle | Selection::RangeChosen { .. } => {
                if self.can_start(date, intervals) {
                    self.start_at(date)
                } else {
                    ClickOutcome::Ignored
                }
            }
            Selection::CheckInChosen { check_in } if date <= check_in => {
                if self.can_start(date, intervals) {
                    self.start_at(date)
                } else {
                    ClickOutcome::Ignored
                }
            }
            Selection::CheckInChosen { check_in } => {
                if !selectable_as_end(&self.status(date, intervals)) {
                    return ClickOutcome::Ignored;
                }
                if let Some(blocker) =
                    first_blocked_in_range(check_in, date, intervals, self.editing)
                {
                    let err = SelectionError::DoubleBooking { blocking: blocker.id };
                    debug!("selection {check_in}..{date} rejected: crosses {}", blocker.id);
                    metrics::counter!(SELECTION_REJECTIONS_TOTAL).increment(1);
                    self.error = Some(err.clone());
                    return ClickOutcome::Rejected(err);
                }
                self.selection = Selection::RangeChosen {
                    check_in,
                    check_out: date,
                };
                self.error = None;
                ClickOutcome::RangeSet(DateSpan::new(check_in, date))
            }
        }
    }

    pub fn cancel(&mut self) -> CalendarSignal {
        self.selection = Selection::Idle;
        self.error = None;
        CalendarSignal::Cancelled
    }

    /// Hand the chosen range to the caller and reset. The caller commits it
    /// through the interval store, which has the final say.
    pub fn confirm(&mut self) -> Result<CalendarSignal, SelectionError> {
        let Selection::RangeChosen { check_in, check_out } = self.selection else {
            return Err(SelectionError::NotReady);
        };
        self.selection = Selection::Idle;
        self.error = None;
        Ok(CalendarSignal::Confirmed(DateSpan::new(check_in, check_out)))
    }

    /// Every day of the visible month with its status and click affordances.
    pub fn month_view(&self, intervals: &[Interval]) -> Vec<CalendarDay> {
        self.month
            .days()
            .map(|date| {
                let status = self.status(date, intervals);
                let past = date < self.today;
                let selected = match self.selection {
                    Selection::Idle => false,
                    Selection::CheckInChosen { check_in } => date == check_in,
                    Selection::RangeChosen { check_in, check_out } => {
                        check_in <= date && date <= check_out
                    }
                };
                let selectable_end = match self.selection {
                    Selection::CheckInChosen { check_in } => {
                        !past
                            && date > check_in
                            && selectable_as_end(&status)
                            && first_blocked_in_range(check_in, date, intervals, self.editing)
                                .is_none()
                    }
                    _ => false,
                };
                CalendarDay {
                    date,
                    status,
                    past,
                    selected,
                    selectable_start: !past && selectable_as_start(&status),
                    selectable_end,
                }
            })
            .collect()
    }
}
