//! Multi-property month timeline.
//!
//! Every property becomes one row with one cell per day of the visible month.
//! A cell holds at most one event. When several categories land on the same
//! day, occupancy fills (bookings, leases) beat point markers (lease ends,
//! payments), which beat icons (cleaning). Inside one tier the category listed
//! first in the filter wins.

use chrono::NaiveDate;
use ulid::Ulid;

use crate::engine::{overlapping, IntervalStore};
use crate::model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineCategory {
    Bookings,
    Leases,
    LeaseEnds,
    Payments,
    Cleaning,
}

impl TimelineCategory {
    pub const ALL: [TimelineCategory; 5] = [
        TimelineCategory::Bookings,
        TimelineCategory::Leases,
        TimelineCategory::LeaseEnds,
        TimelineCategory::Payments,
        TimelineCategory::Cleaning,
    ];

    /// 0 = fill, 1 = point marker, 2 = icon.
    fn tier(&self) -> u8 {
        match self {
            TimelineCategory::Bookings | TimelineCategory::Leases => 0,
            TimelineCategory::LeaseEnds | TimelineCategory::Payments => 1,
            TimelineCategory::Cleaning => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineCategory::Bookings => "bookings",
            TimelineCategory::Leases => "leases",
            TimelineCategory::LeaseEnds => "leaseEnds",
            TimelineCategory::Payments => "payments",
            TimelineCategory::Cleaning => "cleaning",
        }
    }
}

/// Ordered set of enabled categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    enabled: Vec<TimelineCategory>,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl CategoryFilter {
    pub fn all() -> Self {
        Self {
            enabled: TimelineCategory::ALL.to_vec(),
        }
    }

    pub fn none() -> Self {
        Self { enabled: Vec::new() }
    }

    /// Enable exactly `categories`, in the given order. Duplicates are dropped.
    pub fn only(categories: impl IntoIterator<Item = TimelineCategory>) -> Self {
        let mut filter = Self::none();
        for c in categories {
            filter.enable(c);
        }
        filter
    }

    pub fn is_enabled(&self, c: TimelineCategory) -> bool {
        self.enabled.contains(&c)
    }

    /// Appends `c` at the lowest tie-break position if not already enabled.
    pub fn enable(&mut self, c: TimelineCategory) {
        if !self.is_enabled(c) {
            self.enabled.push(c);
        }
    }

    pub fn disable(&mut self, c: TimelineCategory) {
        self.enabled.retain(|e| *e != c);
    }

    pub fn toggle(&mut self, c: TimelineCategory) {
        if self.is_enabled(c) {
            self.disable(c);
        } else {
            self.enable(c);
        }
    }

    pub fn enabled(&self) -> &[TimelineCategory] {
        &self.enabled
    }

    fn rank(&self, c: TimelineCategory) -> Option<(u8, usize)> {
        let pos = self.enabled.iter().position(|e| *e == c)?;
        Some((c.tier(), pos))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub category: TimelineCategory,
    /// Interval, cleaning task, lease or payment id.
    pub source_id: Ulid,
    pub date: NaiveDate,
    pub label: String,
    /// First day of the run in this month; renderers put the label here.
    pub is_start: bool,
    /// Set for bookings.
    pub interval_kind: Option<IntervalCategory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineCell {
    pub date: NaiveDate,
    pub event: Option<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineRow {
    pub property: PropertyInfo,
    pub cells: Vec<TimelineCell>,
}

impl TimelineRow {
    pub fn event_on(&self, date: NaiveDate) -> Option<&TimelineEvent> {
        self.cells
            .iter()
            .find(|c| c.date == date)
            .and_then(|c| c.event.as_ref())
    }
}

/// Everything the aggregator reads from one property.
#[derive(Debug, Clone, Copy)]
pub struct TimelineSource<'a> {
    info: &'a PropertyInfo,
    /// Sorted by check-in, as kept by the store.
    intervals: &'a [Interval],
    cleaning: &'a [CleaningTask],
    leases: &'a [Lease],
    payments: &'a [Payment],
}

impl<'a> TimelineSource<'a> {
    pub fn new(
        info: &'a PropertyInfo,
        store: &'a IntervalStore,
        cleaning: &'a [CleaningTask],
        leases: &'a [Lease],
        payments: &'a [Payment],
    ) -> Self {
        Self {
            info,
            intervals: store.list(),
            cleaning,
            leases,
            payments,
        }
    }

    pub fn info(&self) -> &'a PropertyInfo {
        self.info
    }
}

/// Per-property slot table for one month.
struct MonthSlots<'f> {
    month: YearMonth,
    filter: &'f CategoryFilter,
    slots: Vec<Option<((u8, usize), TimelineEvent)>>,
}

impl<'f> MonthSlots<'f> {
    fn new(month: YearMonth, filter: &'f CategoryFilter) -> Self {
        let len = month.span().nights() as usize;
        Self {
            month,
            filter,
            slots: vec![None; len],
        }
    }

    fn offer(&mut self, event: TimelineEvent) {
        let Some(rank) = self.filter.rank(event.category) else {
            return;
        };
        if !self.month.contains(event.date) {
            return;
        }
        let idx = (event.date - self.month.first_day()).num_days() as usize;
        let slot = &mut self.slots[idx];
        // first offer wins ties within a category
        if slot.as_ref().is_none_or(|(held, _)| rank < *held) {
            *slot = Some((rank, event));
        }
    }

    fn into_cells(self) -> Vec<TimelineCell> {
        self.month
            .days()
            .zip(self.slots)
            .map(|(date, slot)| TimelineCell {
                date,
                event: slot.map(|(_, e)| e),
            })
            .collect()
    }
}

fn project(
    source: &TimelineSource<'_>,
    month: YearMonth,
    filter: &CategoryFilter,
) -> Vec<TimelineCell> {
    let window = month.span();
    let mut slots = MonthSlots::new(month, filter);

    if filter.is_enabled(TimelineCategory::Bookings) {
        for interval in overlapping(source.intervals, &window) {
            let Some(visible) = interval.span.intersect(&window) else {
                continue;
            };
            for date in visible.days() {
                slots.offer(TimelineEvent {
                    category: TimelineCategory::Bookings,
                    source_id: interval.id,
                    date,
                    label: interval.label().to_string(),
                    is_start: date == interval.check_in(),
                    interval_kind: Some(interval.category()),
                });
            }
        }
    }

    if filter.is_enabled(TimelineCategory::Cleaning) {
        for task in source.cleaning.iter().filter(|t| month.contains(t.checkout_date)) {
            slots.offer(TimelineEvent {
                category: TimelineCategory::Cleaning,
                source_id: task.id,
                date: task.checkout_date,
                label: format!("Cleaning: {}", task.guest_name),
                is_start: true,
                interval_kind: None,
            });
        }
    }

    if filter.is_enabled(TimelineCategory::Leases) {
        for lease in source.leases {
            let Some(visible) = lease.span().and_then(|s| s.intersect(&window)) else {
                continue;
            };
            // A lease carried over from last month is labelled again on day one.
            for date in visible.days() {
                slots.offer(TimelineEvent {
                    category: TimelineCategory::Leases,
                    source_id: lease.id,
                    date,
                    label: lease.tenant_name.clone(),
                    is_start: date == visible.start,
                    interval_kind: None,
                });
            }
        }
    }

    if filter.is_enabled(TimelineCategory::LeaseEnds) {
        for lease in source.leases.iter().filter(|l| month.contains(l.end_date)) {
            slots.offer(TimelineEvent {
                category: TimelineCategory::LeaseEnds,
                source_id: lease.id,
                date: lease.end_date,
                label: format!("Lease ends: {}", lease.tenant_name),
                is_start: true,
                interval_kind: None,
            });
        }
    }

    if filter.is_enabled(TimelineCategory::Payments) {
        for payment in source
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending && month.contains(p.due_date))
        {
            slots.offer(TimelineEvent {
                category: TimelineCategory::Payments,
                source_id: payment.id,
                date: payment.due_date,
                label: payment.description.clone(),
                is_start: true,
                interval_kind: None,
            });
        }
    }

    slots.into_cells()
}

/// One row per property for `month`, grouped by property type then name.
pub fn aggregate<'a>(
    month: YearMonth,
    sources: impl IntoIterator<Item = TimelineSource<'a>>,
    filter: &CategoryFilter,
) -> Vec<TimelineRow> {
    let mut sources: Vec<TimelineSource<'a>> = sources.into_iter().collect();
    sources.sort_by(|a, b| {
        a.info
            .property_type
            .cmp(&b.info.property_type)
            .then_with(|| a.info.name.cmp(&b.info.name))
            .then_with(|| a.info.id.cmp(&b.info.id))
    });
    sources
        .iter()
        .map(|source| TimelineRow {
            property: source.info.clone(),
            cells: project(source, month, filter),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn info(name: &str, property_type: PropertyType) -> PropertyInfo {
        PropertyInfo {
            id: Ulid::new(),
            name: name.into(),
            property_type,
            currency: "USD".into(),
        }
    }

    fn booking(start: &str, end: &str) -> Interval {
        Interval {
            id: Ulid::new(),
            span: DateSpan::new(d(start), d(end)),
            kind: IntervalKind::Guest(GuestStay {
                guest_name: "Ana".into(),
                total_price: 0.0,
                security_deposit: 0.0,
                deposit_status: DepositStatus::None,
                auto_cleaning: true,
            }),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    fn lease(start: &str, end: &str) -> Lease {
        Lease {
            id: Ulid::new(),
            tenant_name: "Tenant".into(),
            start_date: d(start),
            end_date: d(end),
            monthly_rent: 1200.0,
        }
    }

    /// Store holding `intervals` with their ids, in whatever order they come.
    fn store_with(info: &PropertyInfo, intervals: &[Interval]) -> IntervalStore {
        let records: Vec<RawInterval> = intervals.iter().map(RawInterval::from).collect();
        IntervalStore::from_records(info.id, &records).unwrap()
    }

    fn source<'a>(
        info: &'a PropertyInfo,
        store: &'a IntervalStore,
        cleaning: &'a [CleaningTask],
        leases: &'a [Lease],
        payments: &'a [Payment],
    ) -> TimelineSource<'a> {
        TimelineSource::new(info, store, cleaning, leases, payments)
    }

    fn jan() -> YearMonth {
        YearMonth::new(2026, 1).unwrap()
    }

    fn all() -> CategoryFilter {
        CategoryFilter::all()
    }

    #[test]
    fn lease_clipped_with_continuation_label() {
        let p = info("Loft", PropertyType::LongTermRental);
        let empty = IntervalStore::new(p.id);
        let leases = vec![lease("2025-12-15", "2026-02-15")];
        let rows = aggregate(jan(), [source(&p, &empty, &[], &leases, &[])], &all());
        let row = &rows[0];
        assert_eq!(row.cells.len(), 31);
        assert!(row.cells.iter().all(|c| {
            c.event.as_ref().map(|e| e.category) == Some(TimelineCategory::Leases)
        }));
        assert!(row.event_on(d("2026-01-01")).unwrap().is_start);
        assert!(!row.event_on(d("2026-01-02")).unwrap().is_start);

        let feb = aggregate(jan().next(), [source(&p, &empty, &[], &leases, &[])], &all());
        let end = feb[0].event_on(d("2026-02-15")).unwrap();
        assert_eq!(end.category, TimelineCategory::LeaseEnds);
        assert!(feb[0].event_on(d("2026-02-14")).unwrap().category == TimelineCategory::Leases);
        assert!(feb[0].event_on(d("2026-02-16")).is_none());
    }

    #[test]
    fn booking_days_and_start_flag() {
        let p = info("Cabin", PropertyType::ShortTermRental);
        let intervals = vec![
            booking("2025-12-30", "2026-01-03"),
            booking("2026-01-10", "2026-01-12"),
        ];
        let store = store_with(&p, &intervals);
        let rows = aggregate(jan(), [source(&p, &store, &[], &[], &[])], &all());
        let row = &rows[0];
        // carried over from December: no start inside January
        assert!(!row.event_on(d("2026-01-01")).unwrap().is_start);
        assert!(row.event_on(d("2026-01-03")).is_none()); // checkout day is free
        assert!(row.event_on(d("2026-01-10")).unwrap().is_start);
        assert!(!row.event_on(d("2026-01-11")).unwrap().is_start);
        assert_eq!(
            row.event_on(d("2026-01-11")).unwrap().interval_kind,
            Some(IntervalCategory::Guest)
        );
        let booked = row.cells.iter().filter(|c| c.event.is_some()).count();
        assert_eq!(booked, 4);
    }

    #[test]
    fn bookings_given_out_of_order_all_show() {
        let p = info("Cabin", PropertyType::ShortTermRental);
        let late = booking("2026-01-20", "2026-01-22");
        let early = booking("2026-01-02", "2026-01-04");
        let store = store_with(&p, &[late.clone(), early.clone()]);
        let rows = aggregate(jan(), [source(&p, &store, &[], &[], &[])], &all());
        assert_eq!(rows[0].event_on(d("2026-01-02")).unwrap().source_id, early.id);
        assert_eq!(rows[0].event_on(d("2026-01-21")).unwrap().source_id, late.id);
    }

    #[test]
    fn fill_beats_marker_beats_icon() {
        let p = info("Cabin", PropertyType::ShortTermRental);
        let intervals = vec![
            booking("2026-01-05", "2026-01-08"),
            booking("2026-01-08", "2026-01-10"),
        ];
        let store = store_with(&p, &intervals);
        let cleaning = CleaningTask {
            id: Ulid::new(),
            guest_name: "Ana".into(),
            checkout_date: d("2026-01-08"),
            status: CleaningStatus::Pending,
            cost: 0.0,
            booking_id: intervals[0].id,
        };
        let cleaning_late = CleaningTask {
            checkout_date: d("2026-01-10"),
            id: Ulid::new(),
            ..cleaning.clone()
        };
        let all_cleaning = vec![cleaning, cleaning_late];
        let payments = vec![Payment {
            id: Ulid::new(),
            lease_id: None,
            description: "HOA".into(),
            due_date: d("2026-01-10"),
            amount: 90.0,
            status: PaymentStatus::Pending,
        }];
        let rows = aggregate(jan(), [source(&p, &store, &all_cleaning, &[], &payments)], &all());
        let row = &rows[0];
        // turnaround day: the incoming booking fills it
        assert_eq!(row.event_on(d("2026-01-08")).unwrap().source_id, intervals[1].id);
        // payment marker beats cleaning icon
        assert_eq!(row.event_on(d("2026-01-10")).unwrap().category, TimelineCategory::Payments);

        let no_bookings =
            CategoryFilter::only([TimelineCategory::Cleaning, TimelineCategory::Payments]);
        let rows = aggregate(
            jan(),
            [source(&p, &store, &all_cleaning, &[], &payments)],
            &no_bookings,
        );
        assert_eq!(rows[0].event_on(d("2026-01-08")).unwrap().category, TimelineCategory::Cleaning);
        assert!(rows[0].event_on(d("2026-01-06")).is_none());
    }

    #[test]
    fn same_tier_tie_uses_filter_order() {
        let p = info("Shop", PropertyType::Commercial);
        let empty = IntervalStore::new(p.id);
        let leases = vec![lease("2025-06-01", "2026-01-20")];
        let payments = vec![Payment {
            id: Ulid::new(),
            lease_id: Some(leases[0].id),
            description: "Final rent".into(),
            due_date: d("2026-01-20"),
            amount: 100.0,
            status: PaymentStatus::Pending,
        }];
        let sources = [source(&p, &empty, &[], &leases, &payments)];

        let payments_first =
            CategoryFilter::only([TimelineCategory::Payments, TimelineCategory::LeaseEnds]);
        let rows = aggregate(jan(), sources, &payments_first);
        assert_eq!(rows[0].event_on(d("2026-01-20")).unwrap().category, TimelineCategory::Payments);

        let ends_first =
            CategoryFilter::only([TimelineCategory::LeaseEnds, TimelineCategory::Payments]);
        let rows = aggregate(jan(), sources, &ends_first);
        assert_eq!(
            rows[0].event_on(d("2026-01-20")).unwrap().category,
            TimelineCategory::LeaseEnds
        );
    }

    #[test]
    fn paid_payments_hidden() {
        let p = info("Shop", PropertyType::Commercial);
        let empty = IntervalStore::new(p.id);
        let payments = vec![Payment {
            id: Ulid::new(),
            lease_id: None,
            description: "Tax".into(),
            due_date: d("2026-01-15"),
            amount: 10.0,
            status: PaymentStatus::Paid,
        }];
        let rows = aggregate(jan(), [source(&p, &empty, &[], &[], &payments)], &all());
        assert!(rows[0].cells.iter().all(|c| c.event.is_none()));
    }

    #[test]
    fn rows_grouped_by_type_then_name() {
        let b = info("Beach", PropertyType::LongTermRental);
        let a = info("Zen", PropertyType::ShortTermRental);
        let c = info("Alpine", PropertyType::ShortTermRental);
        let empty = IntervalStore::new(Ulid::new());
        let rows = aggregate(
            jan(),
            [
                source(&b, &empty, &[], &[], &[]),
                source(&a, &empty, &[], &[], &[]),
                source(&c, &empty, &[], &[], &[]),
            ],
            &all(),
        );
        let names: Vec<&str> = rows.iter().map(|r| r.property.name.as_str()).collect();
        assert_eq!(names, vec!["Alpine", "Zen", "Beach"]);
    }

    #[test]
    fn filter_toggle_and_order() {
        let mut f = CategoryFilter::none();
        f.toggle(TimelineCategory::Cleaning);
        f.enable(TimelineCategory::Bookings);
        f.enable(TimelineCategory::Cleaning);
        assert_eq!(f.enabled(), &[TimelineCategory::Cleaning, TimelineCategory::Bookings]);
        f.toggle(TimelineCategory::Cleaning);
        assert!(!f.is_enabled(TimelineCategory::Cleaning));
    }
}
