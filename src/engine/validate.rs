use chrono::{Datelike, NaiveDate};

use crate::limits::*;
use crate::model::*;

use super::error::ValidationError;

pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn check_year(d: NaiveDate) -> Result<(), ValidationError> {
    if d.year() < MIN_VALID_YEAR || d.year() > MAX_VALID_YEAR {
        return Err(ValidationError::DateOutOfRange(d));
    }
    Ok(())
}

/// Zero-length and inverted ranges are rejected before any overlap check.
pub(crate) fn validate_dates(
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<DateSpan, ValidationError> {
    check_year(check_in)?;
    check_year(check_out)?;
    if check_in == check_out {
        return Err(ValidationError::ZeroLength(check_in));
    }
    if check_out < check_in {
        return Err(ValidationError::InvertedRange { check_in, check_out });
    }
    Ok(DateSpan::new(check_in, check_out))
}

fn check_amount(field: &'static str, v: f64) -> Result<f64, ValidationError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(ValidationError::NegativeAmount(field))
    }
}

/// Resolve a draft into the span and closed kind that will be stored.
pub(crate) fn validate_draft(
    draft: &IntervalDraft,
) -> Result<(DateSpan, IntervalKind), ValidationError> {
    let span = validate_dates(draft.check_in, draft.check_out)?;
    if draft.notes.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong("notes"));
    }
    let kind = match &draft.kind {
        DraftKind::Guest {
            guest_name,
            total_price,
            security_deposit,
            deposit_status,
            auto_cleaning,
        } => {
            let name = guest_name.trim();
            if name.is_empty() {
                return Err(ValidationError::MissingGuestName);
            }
            if name.len() > MAX_GUEST_NAME_LEN {
                return Err(ValidationError::TooLong("guest name"));
            }
            let deposit = check_amount("security deposit", *security_deposit)?;
            IntervalKind::Guest(GuestStay {
                guest_name: name.to_string(),
                total_price: check_amount("total price", *total_price)?,
                security_deposit: deposit,
                deposit_status: deposit_status.unwrap_or(DepositStatus::initial_for(deposit)),
                auto_cleaning: *auto_cleaning,
            })
        }
        DraftKind::Maintenance { expense } => IntervalKind::Maintenance {
            expense: check_amount("maintenance expense", *expense)?,
        },
    };
    Ok((span, kind))
}

/// Turn a persistence record into a draft. Fields that don't apply to the
/// record's kind are dropped.
pub fn draft_from_raw(raw: &RawInterval) -> Result<IntervalDraft, ValidationError> {
    let check_in = parse_date("checkIn", &raw.check_in)?;
    let check_out = parse_date("checkOut", &raw.check_out)?;
    let kind = match raw.kind.trim().to_ascii_lowercase().as_str() {
        "guest" => DraftKind::Guest {
            guest_name: raw.guest_name.clone(),
            total_price: raw.total_price,
            security_deposit: raw.security_deposit,
            deposit_status: raw.deposit_status,
            auto_cleaning: raw.auto_cleaning,
        },
        "maintenance" => DraftKind::Maintenance {
            expense: raw.maintenance_expense,
        },
        other => return Err(ValidationError::UnknownKind(other.to_string())),
    };
    Ok(IntervalDraft {
        check_in,
        check_out,
        kind,
        notes: raw.notes.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn raw(kind: &str, check_in: &str, check_out: &str) -> RawInterval {
        RawInterval {
            id: None,
            kind: kind.into(),
            check_in: check_in.into(),
            check_out: check_out.into(),
            guest_name: "Guest".into(),
            total_price: 300.0,
            security_deposit: 50.0,
            maintenance_expense: 20.0,
            deposit_status: None,
            auto_cleaning: true,
            notes: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn zero_length_rejected() {
        let err = validate_dates(d("2026-01-01"), d("2026-01-01")).unwrap_err();
        assert_eq!(err, ValidationError::ZeroLength(d("2026-01-01")));
    }

    #[test]
    fn inverted_range_rejected() {
        let err = validate_dates(d("2026-01-05"), d("2026-01-01")).unwrap_err();
        assert!(matches!(err, ValidationError::InvertedRange { .. }));
    }

    #[test]
    fn year_bounds() {
        let err = validate_dates(d("1850-01-01"), d("1850-01-03")).unwrap_err();
        assert!(matches!(err, ValidationError::DateOutOfRange(_)));
    }

    #[test]
    fn guest_needs_name() {
        let draft = IntervalDraft::guest("   ", d("2026-01-01"), d("2026-01-02"));
        assert_eq!(validate_draft(&draft).unwrap_err(), ValidationError::MissingGuestName);
    }

    #[test]
    fn negative_and_nan_amounts_rejected() {
        let draft = IntervalDraft::guest("Ana", d("2026-01-01"), d("2026-01-02")).with_price(-1.0);
        assert_eq!(
            validate_draft(&draft).unwrap_err(),
            ValidationError::NegativeAmount("total price")
        );
        let draft = IntervalDraft::maintenance(d("2026-01-01"), d("2026-01-02"), f64::NAN);
        assert_eq!(
            validate_draft(&draft).unwrap_err(),
            ValidationError::NegativeAmount("maintenance expense")
        );
    }

    #[test]
    fn deposit_status_defaults_from_amount() {
        let draft =
            IntervalDraft::guest("Ana", d("2026-01-01"), d("2026-01-02")).with_deposit(100.0);
        let (_, kind) = validate_draft(&draft).unwrap();
        match kind {
            IntervalKind::Guest(g) => assert_eq!(g.deposit_status, DepositStatus::Collected),
            other => panic!("expected guest, got {other:?}"),
        }
        let draft = IntervalDraft::guest("Ana", d("2026-01-01"), d("2026-01-02"));
        let (_, kind) = validate_draft(&draft).unwrap();
        match kind {
            IntervalKind::Guest(g) => assert_eq!(g.deposit_status, DepositStatus::None),
            other => panic!("expected guest, got {other:?}"),
        }
    }

    #[test]
    fn raw_maintenance_drops_guest_money() {
        let draft = draft_from_raw(&raw("maintenance", "2026-02-01", "2026-02-03")).unwrap();
        assert_eq!(draft.kind, DraftKind::Maintenance { expense: 20.0 });
    }

    #[test]
    fn raw_guest_drops_expense() {
        let draft = draft_from_raw(&raw("Guest", "2026-02-01", "2026-02-03")).unwrap();
        let (_, kind) = validate_draft(&draft).unwrap();
        assert_eq!(kind.category(), IntervalCategory::Guest);
    }

    #[test]
    fn raw_bad_date_rejected() {
        let err = draft_from_raw(&raw("guest", "2026-02-30", "2026-03-03")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDate { field: "checkIn", .. }));
    }

    #[test]
    fn raw_unknown_kind_rejected() {
        let err = draft_from_raw(&raw("owner-stay", "2026-02-01", "2026-02-03")).unwrap_err();
        assert_eq!(err, ValidationError::UnknownKind("owner-stay".into()));
    }
}
