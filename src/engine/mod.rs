mod availability;
mod classify;
mod conflict;
mod error;
mod validate;

pub use availability::{next_available, occupancy, subtract_intervals, vacant_spans, Occupancy};
pub use classify::{
    classify, classify_excluding, classify_span, selectable_as_end, selectable_as_start,
};
pub use conflict::{
    check_candidate, find_conflicts, first_blocked_in_range, overlapping, overlaps,
    range_contains_blocked_date,
};
pub use error::{EngineError, ValidationError};
pub use validate::draft_from_raw;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{INTERVAL_MUTATIONS_TOTAL, VALIDATION_FAILURES_TOTAL};

use conflict::check_no_conflict;
use validate::validate_draft;

/// The intervals of one property. Holds the no-overlap invariant across every
/// insert and update; performs no I/O.
#[derive(Debug, Clone)]
pub struct IntervalStore {
    property_id: Ulid,
    /// Sorted by `span.start`; pairwise non-overlapping.
    intervals: Vec<Interval>,
    /// Outbox drained by the owner via `take_events`.
    events: Vec<StoreEvent>,
}

fn record(op: &'static str, result: &Result<Interval, EngineError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(EngineError::Validation(_)) => {
            metrics::counter!(VALIDATION_FAILURES_TOTAL).increment(1);
            "invalid"
        }
        Err(EngineError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    metrics::counter!(INTERVAL_MUTATIONS_TOTAL, "op" => op, "status" => status).increment(1);
}

impl IntervalStore {
    pub fn new(property_id: Ulid) -> Self {
        Self {
            property_id,
            intervals: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Build a store from persisted records. Each record is validated and
    /// checked against those already loaded; the first bad record fails the load.
    /// Records keep their id and creation time when present. No events are emitted.
    pub fn from_records(property_id: Ulid, records: &[RawInterval]) -> Result<Self, EngineError> {
        let mut store = Self::new(property_id);
        if records.len() > MAX_INTERVALS_PER_PROPERTY {
            return Err(EngineError::LimitExceeded("too many intervals on property"));
        }
        for raw in records {
            let draft = draft_from_raw(raw)?;
            let (span, kind) = validate_draft(&draft)?;
            let id = raw.id.unwrap_or_else(Ulid::new);
            if store.get(id).is_some() {
                return Err(EngineError::AlreadyExists(id));
            }
            check_no_conflict(&store.intervals, &span, None)?;
            store.insert_sorted(Interval {
                id,
                span,
                kind,
                notes: draft.notes,
                created_at: raw.created_at.unwrap_or_else(now),
            });
        }
        debug!("loaded {} intervals for property {property_id}", store.len());
        Ok(store)
    }

    pub fn property_id(&self) -> Ulid {
        self.property_id
    }

    /// All intervals, sorted by check-in.
    pub fn list(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn get(&self, id: Ulid) -> Option<&Interval> {
        self.intervals.iter().find(|i| i.id == id)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn overlapping<'a>(
        &'a self,
        query: &DateSpan,
    ) -> impl Iterator<Item = &'a Interval> + use<'a> {
        overlapping(&self.intervals, query)
    }

    pub fn add(&mut self, draft: IntervalDraft) -> Result<Interval, EngineError> {
        let result = self.try_add(draft);
        record("add", &result);
        result
    }

    fn try_add(&mut self, draft: IntervalDraft) -> Result<Interval, EngineError> {
        let (span, kind) = validate_draft(&draft)?;
        if self.intervals.len() >= MAX_INTERVALS_PER_PROPERTY {
            return Err(EngineError::LimitExceeded("too many intervals on property"));
        }
        check_no_conflict(&self.intervals, &span, None)?;

        let interval = Interval {
            id: Ulid::new(),
            span,
            kind,
            notes: draft.notes,
            created_at: now(),
        };
        self.insert_sorted(interval.clone());
        info!(
            "added {} interval {} {} on property {}",
            interval.category().as_str(),
            interval.id,
            interval.span,
            self.property_id
        );

        self.events.push(StoreEvent::IntervalAdded {
            property_id: self.property_id,
            interval: interval.clone(),
        });
        if let IntervalKind::Guest(g) = &interval.kind
            && g.auto_cleaning
        {
            self.events.push(StoreEvent::CleaningRequested {
                property_id: self.property_id,
                booking_id: interval.id,
                guest_name: g.guest_name.clone(),
                checkout_date: interval.check_out(),
            });
        }
        Ok(interval)
    }

    /// Apply `patch` and re-check the result against every other interval.
    pub fn update(&mut self, id: Ulid, patch: &IntervalPatch) -> Result<Interval, EngineError> {
        let result = self.try_update(id, patch);
        record("update", &result);
        result
    }

    fn try_update(&mut self, id: Ulid, patch: &IntervalPatch) -> Result<Interval, EngineError> {
        let current = self.get(id).ok_or(EngineError::NotFound(id))?;
        let draft = patch.apply_to(current);
        let (span, kind) = validate_draft(&draft)?;
        check_no_conflict(&self.intervals, &span, Some(id))?;

        let created_at = current.created_at;
        let updated = Interval {
            id,
            span,
            kind,
            notes: draft.notes,
            created_at,
        };
        self.remove_by_id(id);
        self.insert_sorted(updated.clone());
        info!("updated interval {id} {} on property {}", updated.span, self.property_id);
        self.events.push(StoreEvent::IntervalUpdated {
            property_id: self.property_id,
            interval: updated.clone(),
        });
        Ok(updated)
    }

    /// Move a guest stay's deposit between none / collected / returned.
    pub fn set_deposit_status(
        &mut self,
        id: Ulid,
        status: DepositStatus,
    ) -> Result<Interval, EngineError> {
        let interval = self.get(id).ok_or(EngineError::NotFound(id))?;
        if !interval.is_guest() {
            return Err(ValidationError::NotAGuestStay(id).into());
        }
        let patch = IntervalPatch {
            deposit_status: Some(status),
            ..IntervalPatch::default()
        };
        self.update(id, &patch)
    }

    pub fn remove(&mut self, id: Ulid) -> Result<(), EngineError> {
        if self.remove_by_id(id).is_none() {
            metrics::counter!(INTERVAL_MUTATIONS_TOTAL, "op" => "remove", "status" => "error")
                .increment(1);
            return Err(EngineError::NotFound(id));
        }
        metrics::counter!(INTERVAL_MUTATIONS_TOTAL, "op" => "remove", "status" => "ok")
            .increment(1);
        info!("removed interval {id} from property {}", self.property_id);
        self.events.push(StoreEvent::IntervalRemoved {
            property_id: self.property_id,
            id,
        });
        Ok(())
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// Insert interval maintaining sort order by span.start.
    fn insert_sorted(&mut self, interval: Interval) {
        let pos = self
            .intervals
            .binary_search_by_key(&interval.span.start, |i| i.span.start)
            .unwrap_or_else(|e| e);
        self.intervals.insert(pos, interval);
    }

    fn remove_by_id(&mut self, id: Ulid) -> Option<Interval> {
        let pos = self.intervals.iter().position(|i| i.id == id)?;
        Some(self.intervals.remove(pos))
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}
