use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::calendar::AvailabilityCalendar;
use crate::cleaning::CleaningBoard;
use crate::engine::{classify, EngineError, IntervalStore, ValidationError};
use crate::limits::*;
use crate::model::*;
use crate::persist::{IntervalRepository, PersistError};
use crate::timeline::{aggregate, CategoryFilter, TimelineRow, TimelineSource};

/// A property as supplied by the loading collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    #[serde(flatten)]
    pub info: PropertyInfo,
    #[serde(default)]
    pub intervals: Vec<RawInterval>,
    #[serde(default)]
    pub cleaning_tasks: Vec<CleaningTask>,
    #[serde(default)]
    pub leases: Vec<Lease>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// One property: its interval store plus the collaborators that hang off it.
#[derive(Debug, Clone)]
pub struct Property {
    info: PropertyInfo,
    store: IntervalStore,
    cleaning: CleaningBoard,
    leases: Vec<Lease>,
    payments: Vec<Payment>,
}

fn validate_info(info: &PropertyInfo) -> Result<(), EngineError> {
    if info.name.len() > MAX_PROPERTY_NAME_LEN {
        return Err(EngineError::LimitExceeded("property name too long"));
    }
    Ok(())
}

impl Property {
    pub fn new(info: PropertyInfo, cleaning_cost: f64) -> Self {
        let store = IntervalStore::new(info.id);
        Self {
            info,
            store,
            cleaning: CleaningBoard::new(cleaning_cost),
            leases: Vec::new(),
            payments: Vec::new(),
        }
    }

    pub fn from_record(record: PropertyRecord, cleaning_cost: f64) -> Result<Self, EngineError> {
        validate_info(&record.info)?;
        let store = IntervalStore::from_records(record.info.id, &record.intervals)?;
        let mut property = Self {
            info: record.info,
            store,
            cleaning: CleaningBoard::with_tasks(record.cleaning_tasks, cleaning_cost),
            leases: Vec::new(),
            payments: Vec::new(),
        };
        for lease in record.leases {
            property.add_lease(lease)?;
        }
        for payment in record.payments {
            property.add_payment(payment)?;
        }
        Ok(property)
    }

    pub fn info(&self) -> &PropertyInfo {
        &self.info
    }

    pub fn id(&self) -> Ulid {
        self.info.id
    }

    pub fn store(&self) -> &IntervalStore {
        &self.store
    }

    pub fn intervals(&self) -> &[Interval] {
        self.store.list()
    }

    pub fn cleaning(&self) -> &CleaningBoard {
        &self.cleaning
    }

    pub fn cleaning_mut(&mut self) -> &mut CleaningBoard {
        &mut self.cleaning
    }

    pub fn leases(&self) -> &[Lease] {
        &self.leases
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn classify(&self, date: NaiveDate) -> DayClassification {
        classify(date, self.store.list())
    }

    pub fn edit_calendar(
        &self,
        today: NaiveDate,
        id: Ulid,
    ) -> Result<AvailabilityCalendar, EngineError> {
        let interval = self.store.get(id).ok_or(EngineError::NotFound(id))?;
        Ok(AvailabilityCalendar::editing(today, interval))
    }

    /// Hand store events to the collaborators that consume them.
    fn dispatch_events(&mut self) {
        for event in self.store.take_events() {
            self.cleaning.apply(&event);
        }
    }

    pub fn add_interval(&mut self, draft: IntervalDraft) -> Result<Interval, EngineError> {
        let interval = self.store.add(draft)?;
        self.dispatch_events();
        Ok(interval)
    }

    pub fn update_interval(
        &mut self,
        id: Ulid,
        patch: &IntervalPatch,
    ) -> Result<Interval, EngineError> {
        let interval = self.store.update(id, patch)?;
        self.dispatch_events();
        Ok(interval)
    }

    pub fn remove_interval(&mut self, id: Ulid) -> Result<(), EngineError> {
        self.store.remove(id)?;
        self.dispatch_events();
        Ok(())
    }

    pub fn set_deposit_status(
        &mut self,
        id: Ulid,
        status: DepositStatus,
    ) -> Result<Interval, EngineError> {
        let interval = self.store.set_deposit_status(id, status)?;
        self.dispatch_events();
        Ok(interval)
    }

    pub fn add_lease(&mut self, lease: Lease) -> Result<(), EngineError> {
        if lease.span().is_none() {
            let err = if lease.start_date == lease.end_date {
                ValidationError::ZeroLength(lease.start_date)
            } else {
                ValidationError::InvertedRange {
                    check_in: lease.start_date,
                    check_out: lease.end_date,
                }
            };
            return Err(err.into());
        }
        if self.leases.iter().any(|l| l.id == lease.id) {
            return Err(EngineError::AlreadyExists(lease.id));
        }
        self.leases.push(lease);
        self.leases.sort_by_key(|l| l.start_date);
        Ok(())
    }

    pub fn add_payment(&mut self, payment: Payment) -> Result<(), EngineError> {
        if !(payment.amount.is_finite() && payment.amount >= 0.0) {
            return Err(ValidationError::NegativeAmount("payment amount").into());
        }
        if self.payments.iter().any(|p| p.id == payment.id) {
            return Err(EngineError::AlreadyExists(payment.id));
        }
        self.payments.push(payment);
        self.payments.sort_by_key(|p| p.due_date);
        Ok(())
    }

    pub fn mark_payment_paid(&mut self, id: Ulid) -> Result<&Payment, EngineError> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(EngineError::NotFound(id))?;
        payment.status = PaymentStatus::Paid;
        Ok(payment)
    }

    pub fn timeline_source(&self) -> TimelineSource<'_> {
        TimelineSource::new(
            &self.info,
            &self.store,
            self.cleaning.list(),
            &self.leases,
            &self.payments,
        )
    }

    /// Replace the interval store with the repository's snapshot.
    /// Nothing changes if the snapshot fails to load or validate.
    pub fn reload(&mut self, repo: &impl IntervalRepository) -> Result<(), PersistError> {
        let records = repo.load_intervals(self.info.id)?;
        self.store = IntervalStore::from_records(self.info.id, &records)?;
        debug!("reloaded property {} with {} intervals", self.info.id, self.store.len());
        Ok(())
    }

    pub fn save(&self, repo: &impl IntervalRepository) -> Result<(), PersistError> {
        repo.save_intervals(self.info.id, self.store.list())
    }
}

/// Application state: every property the owner tracks.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    properties: Vec<Property>,
    cleaning_cost: f64,
}

impl Portfolio {
    pub fn new(cleaning_cost: f64) -> Self {
        Self {
            properties: Vec::new(),
            cleaning_cost,
        }
    }

    pub fn from_records(
        records: Vec<PropertyRecord>,
        cleaning_cost: f64,
    ) -> Result<Self, EngineError> {
        let mut portfolio = Self::new(cleaning_cost);
        if records.len() > MAX_PROPERTIES {
            return Err(EngineError::LimitExceeded("too many properties"));
        }
        for record in records {
            let property = Property::from_record(record, cleaning_cost)?;
            portfolio.insert(property)?;
        }
        info!("portfolio loaded with {} properties", portfolio.len());
        Ok(portfolio)
    }

    fn insert(&mut self, property: Property) -> Result<&mut Property, EngineError> {
        if self.properties.len() >= MAX_PROPERTIES {
            return Err(EngineError::LimitExceeded("too many properties"));
        }
        if self.get(property.id()).is_some() {
            return Err(EngineError::AlreadyExists(property.id()));
        }
        self.properties.push(property);
        let last = self.properties.len() - 1;
        Ok(&mut self.properties[last])
    }

    pub fn add_property(&mut self, info: PropertyInfo) -> Result<&mut Property, EngineError> {
        validate_info(&info)?;
        let property = Property::new(info, self.cleaning_cost);
        self.insert(property)
    }

    pub fn remove_property(&mut self, id: Ulid) -> Result<Property, EngineError> {
        let pos = self
            .properties
            .iter()
            .position(|p| p.id() == id)
            .ok_or(EngineError::NotFound(id))?;
        Ok(self.properties.remove(pos))
    }

    pub fn get(&self, id: Ulid) -> Option<&Property> {
        self.properties.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: Ulid) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.id() == id)
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn timeline(&self, month: YearMonth, filter: &CategoryFilter) -> Vec<TimelineRow> {
        aggregate(month, self.properties.iter().map(Property::timeline_source), filter)
    }

    pub fn save_all(&self, repo: &impl IntervalRepository) -> Result<(), PersistError> {
        for property in &self.properties {
            property.save(repo)?;
        }
        Ok(())
    }
}
