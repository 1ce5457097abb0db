// ── Mutation metrics ────────────────────────────────────────────

/// Counter: interval store mutations. Labels: op, status.
pub const INTERVAL_MUTATIONS_TOTAL: &str = "staybook_interval_mutations_total";

/// Counter: candidates rejected for overlapping an existing interval.
pub const CONFLICTS_TOTAL: &str = "staybook_conflicts_total";

/// Counter: drafts rejected by validation.
pub const VALIDATION_FAILURES_TOTAL: &str = "staybook_validation_failures_total";

// ── Collaborator metrics ────────────────────────────────────────

/// Counter: picker clicks rejected as double bookings.
pub const SELECTION_REJECTIONS_TOTAL: &str = "staybook_selection_rejections_total";

/// Counter: cleaning tasks materialized from checkout requests.
pub const CLEANING_TASKS_CREATED_TOTAL: &str = "staybook_cleaning_tasks_created_total";

/// Counter: snapshot saves. Labels: status.
pub const SNAPSHOT_WRITES_TOTAL: &str = "staybook_snapshot_writes_total";

/// Install the fmt subscriber at INFO, or DEBUG when `verbose`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}
