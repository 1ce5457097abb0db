use chrono::NaiveDate;
use ulid::Ulid;

/// Malformed or out-of-range input. Always raised before store state is touched.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    ZeroLength(NaiveDate),
    InvertedRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    MissingGuestName,
    NegativeAmount(&'static str),
    InvalidDate {
        field: &'static str,
        value: String,
    },
    DateOutOfRange(NaiveDate),
    UnknownKind(String),
    TooLong(&'static str),
    NotAGuestStay(Ulid),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ZeroLength(d) => {
                write!(f, "check-in and check-out are both {d}: stay must be at least one night")
            }
            ValidationError::InvertedRange { check_in, check_out } => {
                write!(f, "check-out {check_out} is before check-in {check_in}")
            }
            ValidationError::MissingGuestName => write!(f, "guest name is required"),
            ValidationError::NegativeAmount(field) => write!(f, "{field} must not be negative"),
            ValidationError::InvalidDate { field, value } => {
                write!(f, "{field}: cannot parse date {value:?} (expected YYYY-MM-DD)")
            }
            ValidationError::DateOutOfRange(d) => write!(f, "date out of range: {d}"),
            ValidationError::UnknownKind(k) => write!(f, "unknown interval kind: {k:?}"),
            ValidationError::TooLong(field) => write!(f, "{field} too long"),
            ValidationError::NotAGuestStay(id) => write!(f, "interval {id} is not a guest stay"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Validation(ValidationError),
    /// Candidate overlaps these stored intervals.
    Conflict(Vec<Ulid>),
    NotFound(Ulid),
    AlreadyExists(Ulid),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(e) => write!(f, "invalid interval: {e}"),
            EngineError::Conflict(ids) => {
                write!(f, "conflict with interval")?;
                if ids.len() > 1 {
                    write!(f, "s")?;
                }
                for (i, id) in ids.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { ", " };
                    write!(f, "{sep}{id}")?;
                }
                Ok(())
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::Validation(e)
    }
}
