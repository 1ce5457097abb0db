use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Label shown in place of a guest name on maintenance blocks.
pub const MAINTENANCE_LABEL: &str = "Maintenance";

/// Half-open date range `[start, end)`. `end` is the checkout day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "DateSpan start must be before end");
        Self { start, end }
    }

    /// Number of nights (days in `[start, end)`).
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &DateSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_date(&self, d: NaiveDate) -> bool {
        self.start <= d && d < self.end
    }

    /// Strictly between start and end, both excluded.
    pub fn contains_interior(&self, d: NaiveDate) -> bool {
        self.start < d && d < self.end
    }

    pub fn contains_span(&self, other: &DateSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersect(&self, other: &DateSpan) -> Option<DateSpan> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| DateSpan::new(start, end))
    }

    /// Every day in `[start, end)`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

impl fmt::Display for DateSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A calendar month, anchored on its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Self { first })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            first: date - chrono::Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.following_first()
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    fn following_first(&self) -> Option<NaiveDate> {
        self.first.checked_add_months(Months::new(1))
    }

    /// Saturates at the last month chrono can represent.
    pub fn next(&self) -> Self {
        Self {
            first: self
                .first
                .checked_add_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    pub fn prev(&self) -> Self {
        Self {
            first: self
                .first
                .checked_sub_months(Months::new(1))
                .unwrap_or(self.first),
        }
    }

    /// The month as a half-open span `[first day, first day of next month)`.
    /// The last representable month ends at `NaiveDate::MAX`, which it excludes.
    pub fn span(&self) -> DateSpan {
        DateSpan::new(self.first, self.following_first().unwrap_or(NaiveDate::MAX))
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.span().days()
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.span().contains_date(d)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = chrono::ParseError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let first = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")?;
        Ok(Self { first })
    }
}

// ── Intervals ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalCategory {
    Guest,
    Maintenance,
}

impl IntervalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalCategory::Guest => "guest",
            IntervalCategory::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    #[default]
    None,
    Collected,
    Returned,
}

impl DepositStatus {
    /// Initial status for a newly created stay.
    pub fn initial_for(deposit: f64) -> Self {
        if deposit > 0.0 {
            DepositStatus::Collected
        } else {
            DepositStatus::None
        }
    }
}

/// Fields that only exist on a guest stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestStay {
    pub guest_name: String,
    pub total_price: f64,
    pub security_deposit: f64,
    pub deposit_status: DepositStatus,
    pub auto_cleaning: bool,
}

/// What an interval represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IntervalKind {
    Guest(GuestStay),
    Maintenance { expense: f64 },
}

impl IntervalKind {
    pub fn category(&self) -> IntervalCategory {
        match self {
            IntervalKind::Guest(_) => IntervalCategory::Guest,
            IntervalKind::Maintenance { .. } => IntervalCategory::Maintenance,
        }
    }
}

/// A single reservation or maintenance block on one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: Ulid,
    pub span: DateSpan,
    pub kind: IntervalKind,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Interval {
    pub fn check_in(&self) -> NaiveDate {
        self.span.start
    }

    pub fn check_out(&self) -> NaiveDate {
        self.span.end
    }

    pub fn category(&self) -> IntervalCategory {
        self.kind.category()
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.kind, IntervalKind::Guest(_))
    }

    /// Guest name, or the maintenance sentinel.
    pub fn label(&self) -> &str {
        match &self.kind {
            IntervalKind::Guest(g) => &g.guest_name,
            IntervalKind::Maintenance { .. } => MAINTENANCE_LABEL,
        }
    }

    pub fn total_price(&self) -> f64 {
        match &self.kind {
            IntervalKind::Guest(g) => g.total_price,
            IntervalKind::Maintenance { .. } => 0.0,
        }
    }

    pub fn security_deposit(&self) -> f64 {
        match &self.kind {
            IntervalKind::Guest(g) => g.security_deposit,
            IntervalKind::Maintenance { .. } => 0.0,
        }
    }

    pub fn maintenance_expense(&self) -> f64 {
        match &self.kind {
            IntervalKind::Guest(_) => 0.0,
            IntervalKind::Maintenance { expense } => *expense,
        }
    }

    pub fn deposit_status(&self) -> DepositStatus {
        match &self.kind {
            IntervalKind::Guest(g) => g.deposit_status,
            IntervalKind::Maintenance { .. } => DepositStatus::None,
        }
    }

    pub fn auto_cleaning(&self) -> bool {
        match &self.kind {
            IntervalKind::Guest(g) => g.auto_cleaning,
            IntervalKind::Maintenance { .. } => false,
        }
    }
}

/// Kind-specific input for a new interval, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftKind {
    Guest {
        guest_name: String,
        total_price: f64,
        security_deposit: f64,
        /// `None` picks the default from the deposit amount.
        deposit_status: Option<DepositStatus>,
        auto_cleaning: bool,
    },
    Maintenance {
        expense: f64,
    },
}

/// Unvalidated candidate for `IntervalStore::add`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalDraft {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub kind: DraftKind,
    pub notes: String,
}

impl IntervalDraft {
    pub fn guest(guest_name: impl Into<String>, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in,
            check_out,
            kind: DraftKind::Guest {
                guest_name: guest_name.into(),
                total_price: 0.0,
                security_deposit: 0.0,
                deposit_status: None,
                auto_cleaning: false,
            },
            notes: String::new(),
        }
    }

    pub fn maintenance(check_in: NaiveDate, check_out: NaiveDate, expense: f64) -> Self {
        Self {
            check_in,
            check_out,
            kind: DraftKind::Maintenance { expense },
            notes: String::new(),
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        if let DraftKind::Guest { total_price, .. } = &mut self.kind {
            *total_price = price;
        }
        self
    }

    pub fn with_deposit(mut self, deposit: f64) -> Self {
        if let DraftKind::Guest { security_deposit, .. } = &mut self.kind {
            *security_deposit = deposit;
        }
        self
    }

    pub fn with_auto_cleaning(mut self, on: bool) -> Self {
        if let DraftKind::Guest { auto_cleaning, .. } = &mut self.kind {
            *auto_cleaning = on;
        }
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn category(&self) -> IntervalCategory {
        match self.kind {
            DraftKind::Guest { .. } => IntervalCategory::Guest,
            DraftKind::Maintenance { .. } => IntervalCategory::Maintenance,
        }
    }
}

/// Partial edit of an existing interval. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalPatch {
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    /// Switches between guest stay and maintenance block.
    pub kind: Option<IntervalCategory>,
    pub guest_name: Option<String>,
    pub total_price: Option<f64>,
    pub security_deposit: Option<f64>,
    pub deposit_status: Option<DepositStatus>,
    pub auto_cleaning: Option<bool>,
    pub maintenance_expense: Option<f64>,
    pub notes: Option<String>,
}

impl IntervalPatch {
    pub fn dates(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in: Some(check_in),
            check_out: Some(check_out),
            ..Self::default()
        }
    }

    /// Merge the patch over `current`. The result still has to be validated.
    pub fn apply_to(&self, current: &Interval) -> IntervalDraft {
        let target = self.kind.unwrap_or(current.category());
        let kind = match target {
            IntervalCategory::Guest => {
                let base = match &current.kind {
                    IntervalKind::Guest(g) => Some(g),
                    IntervalKind::Maintenance { .. } => None,
                };
                DraftKind::Guest {
                    guest_name: self
                        .guest_name
                        .clone()
                        .or_else(|| base.map(|g| g.guest_name.clone()))
                        .unwrap_or_default(),
                    total_price: self
                        .total_price
                        .or(base.map(|g| g.total_price))
                        .unwrap_or(0.0),
                    security_deposit: self
                        .security_deposit
                        .or(base.map(|g| g.security_deposit))
                        .unwrap_or(0.0),
                    deposit_status: self.deposit_status.or(base.map(|g| g.deposit_status)),
                    auto_cleaning: self
                        .auto_cleaning
                        .or(base.map(|g| g.auto_cleaning))
                        .unwrap_or(false),
                }
            }
            IntervalCategory::Maintenance => DraftKind::Maintenance {
                expense: self
                    .maintenance_expense
                    .unwrap_or(current.maintenance_expense()),
            },
        };
        IntervalDraft {
            check_in: self.check_in.unwrap_or(current.check_in()),
            check_out: self.check_out.unwrap_or(current.check_out()),
            kind,
            notes: self.notes.clone().unwrap_or_else(|| current.notes.clone()),
        }
    }
}

/// Interval record as exchanged with the persistence collaborator.
/// Dates are `YYYY-MM-DD` strings; money fields not valid for `kind` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInterval {
    #[serde(default)]
    pub id: Option<Ulid>,
    #[serde(default = "default_raw_kind")]
    pub kind: String,
    pub check_in: String,
    pub check_out: String,
    #[serde(default)]
    pub guest_name: String,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub security_deposit: f64,
    #[serde(default)]
    pub maintenance_expense: f64,
    #[serde(default)]
    pub deposit_status: Option<DepositStatus>,
    #[serde(default)]
    pub auto_cleaning: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_raw_kind() -> String {
    IntervalCategory::Guest.as_str().to_string()
}

impl From<&Interval> for RawInterval {
    fn from(i: &Interval) -> Self {
        RawInterval {
            id: Some(i.id),
            kind: i.category().as_str().to_string(),
            check_in: i.check_in().format("%Y-%m-%d").to_string(),
            check_out: i.check_out().format("%Y-%m-%d").to_string(),
            guest_name: match &i.kind {
                IntervalKind::Guest(g) => g.guest_name.clone(),
                IntervalKind::Maintenance { .. } => MAINTENANCE_LABEL.to_string(),
            },
            total_price: i.total_price(),
            security_deposit: i.security_deposit(),
            maintenance_expense: i.maintenance_expense(),
            deposit_status: Some(i.deposit_status()),
            auto_cleaning: i.auto_cleaning(),
            notes: i.notes.clone(),
            created_at: Some(i.created_at),
        }
    }
}

// ── Store events ────────────────────────────────────────────────

/// Emitted by `IntervalStore` mutations; drained by the owning property.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    IntervalAdded {
        property_id: Ulid,
        interval: Interval,
    },
    IntervalUpdated {
        property_id: Ulid,
        interval: Interval,
    },
    IntervalRemoved {
        property_id: Ulid,
        id: Ulid,
    },
    /// A guest stay was created with auto-cleaning on.
    CleaningRequested {
        property_id: Ulid,
        booking_id: Ulid,
        guest_name: String,
        checkout_date: NaiveDate,
    },
}

// ── Cleaning, leases, payments, properties ──────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningStatus {
    #[default]
    Pending,
    Scheduled,
    Completed,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningTask {
    pub id: Ulid,
    pub guest_name: String,
    pub checkout_date: NaiveDate,
    pub status: CleaningStatus,
    pub cost: f64,
    /// Source booking, for lookup only.
    pub booking_id: Ulid,
}

/// Long-term lease. Occupies `[start_date, end_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: Ulid,
    pub tenant_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub monthly_rent: f64,
}

impl Lease {
    /// `None` for a lease whose end is not after its start.
    pub fn span(&self) -> Option<DateSpan> {
        (self.start_date < self.end_date).then(|| DateSpan::new(self.start_date, self.end_date))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

/// One installment owed on a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Ulid,
    #[serde(default)]
    pub lease_id: Option<Ulid>,
    pub description: String,
    pub due_date: NaiveDate,
    pub amount: f64,
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Declaration order is the timeline's row grouping order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    ShortTermRental,
    LongTermRental,
    Commercial,
    Residence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub id: Ulid,
    pub name: String,
    pub property_type: PropertyType,
    /// Display label only.
    #[serde(default)]
    pub currency: String,
}

// ── Query result types ───────────────────────────────────────────

/// The interval responsible for a day's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRef {
    pub id: Ulid,
    pub kind: IntervalCategory,
}

impl From<&Interval> for IntervalRef {
    fn from(i: &Interval) -> Self {
        IntervalRef {
            id: i.id,
            kind: i.category(),
        }
    }
}

/// Status of one calendar day on one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClassification {
    Vacant,
    CheckIn(IntervalRef),
    CheckOut(IntervalRef),
    /// `outgoing` checks out and `incoming` checks in on the same day.
    Turnaround {
        outgoing: IntervalRef,
        incoming: IntervalRef,
    },
    FullyBooked(IntervalRef),
}

impl DayClassification {
    pub fn is_vacant(&self) -> bool {
        matches!(self, DayClassification::Vacant)
    }

    /// Ids of the intervals touching this day (two for a turnaround).
    pub fn interval_ids(&self) -> Vec<Ulid> {
        match self {
            DayClassification::Vacant => Vec::new(),
            DayClassification::CheckIn(r)
            | DayClassification::CheckOut(r)
            | DayClassification::FullyBooked(r) => vec![r.id],
            DayClassification::Turnaround { outgoing, incoming } => vec![outgoing.id, incoming.id],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DayClassification::Vacant => "vacant",
            DayClassification::CheckIn(_) => "checkIn",
            DayClassification::CheckOut(_) => "checkOut",
            DayClassification::Turnaround { .. } => "turnaround",
            DayClassification::FullyBooked(_) => "fullyBooked",
        }
    }
}
