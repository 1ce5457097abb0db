use tracing::info;
use ulid::Ulid;

use crate::engine::EngineError;
use crate::model::*;
use crate::observability::CLEANING_TASKS_CREATED_TOTAL;

/// Cleaning tasks of one property. Fed by `StoreEvent::CleaningRequested`;
/// after creation a task lives independently of its booking.
#[derive(Debug, Clone, Default)]
pub struct CleaningBoard {
    tasks: Vec<CleaningTask>,
    default_cost: f64,
}

impl CleaningBoard {
    pub fn new(default_cost: f64) -> Self {
        Self {
            tasks: Vec::new(),
            default_cost,
        }
    }

    pub fn with_tasks(tasks: Vec<CleaningTask>, default_cost: f64) -> Self {
        let mut board = Self { tasks, default_cost };
        board.tasks.sort_by_key(|t| t.checkout_date);
        board
    }

    /// Materialize a task for a cleaning request; other events are ignored.
    pub fn apply(&mut self, event: &StoreEvent) -> Option<&CleaningTask> {
        let StoreEvent::CleaningRequested {
            property_id,
            booking_id,
            guest_name,
            checkout_date,
        } = event
        else {
            return None;
        };
        let task = CleaningTask {
            id: Ulid::new(),
            guest_name: guest_name.clone(),
            checkout_date: *checkout_date,
            status: CleaningStatus::Pending,
            cost: self.default_cost,
            booking_id: *booking_id,
        };
        info!(
            "cleaning task {} for {guest_name} on {checkout_date} (property {property_id})",
            task.id
        );
        metrics::counter!(CLEANING_TASKS_CREATED_TOTAL).increment(1);

        let pos = self.tasks.partition_point(|t| t.checkout_date <= task.checkout_date);
        self.tasks.insert(pos, task);
        self.tasks.get(pos)
    }

    /// Tasks ordered by checkout date.
    pub fn list(&self) -> &[CleaningTask] {
        &self.tasks
    }

    pub fn get(&self, id: Ulid) -> Option<&CleaningTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn for_booking(&self, booking_id: Ulid) -> impl Iterator<Item = &CleaningTask> {
        self.tasks.iter().filter(move |t| t.booking_id == booking_id)
    }

    pub fn update_status(
        &mut self,
        id: Ulid,
        status: CleaningStatus,
    ) -> Result<&CleaningTask, EngineError> {
        let task = self.get_mut(id)?;
        task.status = status;
        Ok(task)
    }

    pub fn set_cost(&mut self, id: Ulid, cost: f64) -> Result<&CleaningTask, EngineError> {
        if !(cost.is_finite() && cost >= 0.0) {
            return Err(crate::engine::ValidationError::NegativeAmount("cleaning cost").into());
        }
        let task = self.get_mut(id)?;
        task.cost = cost;
        Ok(task)
    }

    pub fn remove(&mut self, id: Ulid) -> Result<CleaningTask, EngineError> {
        let pos = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(EngineError::NotFound(id))?;
        Ok(self.tasks.remove(pos))
    }

    fn get_mut(&mut self, id: Ulid) -> Result<&mut CleaningTask, EngineError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(EngineError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request(booking_id: Ulid, checkout: &str) -> StoreEvent {
        StoreEvent::CleaningRequested {
            property_id: Ulid::new(),
            booking_id,
            guest_name: "Ana".into(),
            checkout_date: d(checkout),
        }
    }

    #[test]
    fn request_materializes_pending_task() {
        let mut board = CleaningBoard::new(45.0);
        let booking = Ulid::new();
        let task = board.apply(&request(booking, "2026-01-05")).unwrap().clone();
        assert_eq!(task.status, CleaningStatus::Pending);
        assert_eq!(task.cost, 45.0);
        assert_eq!(task.booking_id, booking);
        assert_eq!(board.for_booking(booking).count(), 1);
    }

    #[test]
    fn other_events_ignored() {
        let mut board = CleaningBoard::new(0.0);
        let removed = StoreEvent::IntervalRemoved {
            property_id: Ulid::new(),
            id: Ulid::new(),
        };
        assert!(board.apply(&removed).is_none());
        assert!(board.list().is_empty());
    }

    #[test]
    fn tasks_sorted_by_checkout() {
        let mut board = CleaningBoard::new(0.0);
        board.apply(&request(Ulid::new(), "2026-02-01"));
        board.apply(&request(Ulid::new(), "2026-01-10"));
        board.apply(&request(Ulid::new(), "2026-01-20"));
        let dates: Vec<NaiveDate> = board.list().iter().map(|t| t.checkout_date).collect();
        assert_eq!(dates, vec![d("2026-01-10"), d("2026-01-20"), d("2026-02-01")]);
    }

    #[test]
    fn status_cost_and_removal() {
        let mut board = CleaningBoard::new(0.0);
        let id = board.apply(&request(Ulid::new(), "2026-01-05")).unwrap().id;
        assert_eq!(
            board.update_status(id, CleaningStatus::Scheduled).unwrap().status,
            CleaningStatus::Scheduled
        );
        assert_eq!(board.set_cost(id, 60.0).unwrap().cost, 60.0);
        assert!(board.set_cost(id, -1.0).is_err());
        board.remove(id).unwrap();
        assert_eq!(board.remove(id).unwrap_err(), EngineError::NotFound(id));
    }
}
