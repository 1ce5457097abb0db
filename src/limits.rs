//! Hard input limits. Violations surface as validation or limit errors.

pub const MAX_INTERVALS_PER_PROPERTY: usize = 10_000;
pub const MAX_GUEST_NAME_LEN: usize = 200;
pub const MAX_NOTES_LEN: usize = 4_000;
pub const MAX_PROPERTY_NAME_LEN: usize = 200;
pub const MAX_PROPERTIES: usize = 1_000;

/// Earliest and latest accepted calendar years.
pub const MIN_VALID_YEAR: i32 = 1900;
pub const MAX_VALID_YEAR: i32 = 2200;

/// Widest window accepted by range queries (about ten years).
pub const MAX_QUERY_WINDOW_DAYS: i64 = 3_660;
