use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::ApiError;
use crate::transactions::repo::{NewTransaction, Transaction, TxFilter, TxKind, TxPatch};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

const MAX_DESCRIPTION: usize = 200;
const MAX_CATEGORY: usize = 100;
const MAX_NOTE: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct CreateTransaction {
    pub description: String,
    pub amount: Decimal,
    pub kind: TxKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(with = "iso_date")]
    pub occurred_on: Date,
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update body. `category` and `note` are nullable columns, so they
/// use a present-vs-null aware double `Option`; for the non-nullable fields
/// an explicit `null` reads the same as leaving the field out.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransaction {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub kind: Option<TxKind>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
    #[serde(default, with = "iso_date::option")]
    pub occurred_on: Option<Date>,
    #[serde(default, deserialize_with = "present")]
    pub note: Option<Option<String>>,
}

/// Keeps "field present with value null" distinct from "field absent".
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub kind: Option<TxKind>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionOut {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: String,
    pub category: Option<String>,
    #[serde(with = "iso_date")]
    pub occurred_on: Date,
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Transaction> for TransactionOut {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            description: t.description,
            amount: t.amount,
            kind: t.kind,
            category: t.category,
            occurred_on: t.occurred_on,
            note: t.note,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionList {
    pub items: Vec<TransactionOut>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn check_description(s: &str) -> Result<(), ApiError> {
    let len = s.chars().count();
    if len == 0 || len > MAX_DESCRIPTION {
        return Err(ApiError::Validation(format!(
            "description must be between 1 and {MAX_DESCRIPTION} characters"
        )));
    }
    Ok(())
}

fn check_category(s: &str) -> Result<(), ApiError> {
    if s.chars().count() > MAX_CATEGORY {
        return Err(ApiError::Validation(format!(
            "category must be at most {MAX_CATEGORY} characters"
        )));
    }
    Ok(())
}

fn check_note(s: &str) -> Result<(), ApiError> {
    if s.chars().count() > MAX_NOTE {
        return Err(ApiError::Validation(format!(
            "note must be at most {MAX_NOTE} characters"
        )));
    }
    Ok(())
}

/// Positive, normalized to the two fractional digits the column stores.
fn check_amount(amount: Decimal) -> Result<Decimal, ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation("amount must be positive".into()));
    }
    Ok(amount.round_dp(2))
}

fn check_occurred_on(d: Date) -> Result<Date, ApiError> {
    if d > OffsetDateTime::now_utc().date() {
        return Err(ApiError::Validation(
            "occurred_on must not be in the future".into(),
        ));
    }
    Ok(d)
}

fn amount_bound(name: &str, value: Option<f64>) -> Result<Option<Decimal>, ApiError> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() || v < 0.0 => Err(ApiError::Validation(format!(
            "{name} must not be negative"
        ))),
        Some(v) => Decimal::from_f64(v)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("{name} is out of range"))),
    }
}

impl CreateTransaction {
    pub fn validate(self) -> Result<NewTransaction, ApiError> {
        check_description(&self.description)?;
        let amount = check_amount(self.amount)?;
        if let Some(c) = &self.category {
            check_category(c)?;
        }
        let occurred_on = check_occurred_on(self.occurred_on)?;
        if let Some(n) = &self.note {
            check_note(n)?;
        }
        Ok(NewTransaction {
            description: self.description,
            amount,
            kind: self.kind,
            category: self.category,
            occurred_on,
            note: self.note,
        })
    }
}

impl UpdateTransaction {
    pub fn validate(self) -> Result<TxPatch, ApiError> {
        if let Some(d) = &self.description {
            check_description(d)?;
        }
        let amount = self.amount.map(check_amount).transpose()?;
        if let Some(Some(c)) = &self.category {
            check_category(c)?;
        }
        let occurred_on = self.occurred_on.map(check_occurred_on).transpose()?;
        if let Some(Some(n)) = &self.note {
            check_note(n)?;
        }
        Ok(TxPatch {
            description: self.description,
            amount,
            kind: self.kind,
            category: self.category,
            occurred_on,
            note: self.note,
        })
    }
}

impl ListQuery {
    /// Bounds-checks pagination and converts the raw params into the
    /// engine's filter. Out-of-range values are rejected, not clamped.
    pub fn validate(self) -> Result<(i64, i64, TxFilter), ApiError> {
        let limit = self.limit.unwrap_or(50);
        if !(1..=200).contains(&limit) {
            return Err(ApiError::Validation(
                "limit must be between 1 and 200".into(),
            ));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ApiError::Validation("offset must not be negative".into()));
        }

        let filter = TxFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            kind: self.kind,
            category: self.category,
            q: self.q,
            min_amount: amount_bound("min_amount", self.min_amount)?,
            max_amount: amount_bound("max_amount", self.max_amount)?,
        };
        Ok((limit, offset, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn create_body(amount: f64) -> CreateTransaction {
        serde_json::from_value(serde_json::json!({
            "description": "Coffee",
            "amount": amount,
            "kind": "expense",
            "category": "Food",
            "occurred_on": "2024-01-10"
        }))
        .expect("valid body")
    }

    #[test]
    fn amount_survives_the_json_round_trip_exactly() {
        let body = create_body(123.45);
        let new = body.validate().expect("valid");
        assert_eq!(new.amount, Decimal::new(12345, 2));

        let out = TransactionOut {
            id: 1,
            description: "Coffee".into(),
            amount: new.amount,
            kind: "expense".into(),
            category: None,
            occurred_on: date!(2024 - 01 - 10),
            note: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&out).expect("serialize");
        assert_eq!(json["amount"].as_f64(), Some(123.45));
        assert_eq!(json["occurred_on"], "2024-01-10");
    }

    #[test]
    fn amount_is_normalized_to_two_decimal_places() {
        let new = create_body(10.999).validate().expect("valid");
        assert_eq!(new.amount, Decimal::new(1100, 2));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(create_body(0.0).validate().is_err());
        assert!(create_body(-4.5).validate().is_err());
    }

    #[test]
    fn empty_and_overlong_descriptions_are_rejected() {
        let mut body = create_body(1.0);
        body.description = String::new();
        assert!(body.validate().is_err());

        let mut body = create_body(1.0);
        body.description = "x".repeat(201);
        assert!(body.validate().is_err());
    }

    #[test]
    fn overlong_category_and_note_are_rejected() {
        let mut body = create_body(1.0);
        body.category = Some("x".repeat(101));
        assert!(body.validate().is_err());

        let mut body = create_body(1.0);
        body.note = Some("x".repeat(1001));
        assert!(body.validate().is_err());
    }

    #[test]
    fn future_dates_are_rejected() {
        let mut body = create_body(1.0);
        body.occurred_on = OffsetDateTime::now_utc()
            .date()
            .next_day()
            .expect("tomorrow");
        assert!(body.validate().is_err());

        let mut body = create_body(1.0);
        body.occurred_on = OffsetDateTime::now_utc().date();
        assert!(body.validate().is_ok());
    }

    #[test]
    fn update_distinguishes_absent_null_and_value() {
        let absent: UpdateTransaction = serde_json::from_str("{}").expect("parse");
        assert!(absent.note.is_none());

        let null: UpdateTransaction =
            serde_json::from_str(r#"{"note": null, "category": null}"#).expect("parse");
        assert_eq!(null.note, Some(None));
        assert_eq!(null.category, Some(None));

        let value: UpdateTransaction =
            serde_json::from_str(r#"{"note": "updated"}"#).expect("parse");
        assert_eq!(value.note, Some(Some("updated".into())));
    }

    #[test]
    fn update_validates_present_fields_only() {
        let patch = UpdateTransaction {
            note: Some(Some("updated".into())),
            ..UpdateTransaction::default()
        }
        .validate()
        .expect("valid");
        assert!(patch.description.is_none());
        assert_eq!(patch.note, Some(Some("updated".into())));

        let bad = UpdateTransaction {
            amount: Some(Decimal::ZERO),
            ..UpdateTransaction::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn list_query_defaults_and_bounds() {
        let (limit, offset, filter) = ListQuery::default().validate().expect("valid");
        assert_eq!(limit, 50);
        assert_eq!(offset, 0);
        assert!(filter.min_amount.is_none());

        for (limit, offset) in [(Some(0), None), (Some(201), None), (None, Some(-1))] {
            let q = ListQuery {
                limit,
                offset,
                ..ListQuery::default()
            };
            assert!(q.validate().is_err());
        }
    }

    #[test]
    fn zero_amount_bound_passes_through_as_zero() {
        // The engine drops a zero bound; here it just converts.
        let q = ListQuery {
            min_amount: Some(0.0),
            ..ListQuery::default()
        };
        let (_, _, filter) = q.validate().expect("valid");
        assert_eq!(filter.min_amount, Some(Decimal::ZERO));
    }

    #[test]
    fn negative_amount_bound_is_rejected() {
        let q = ListQuery {
            min_amount: Some(-1.0),
            ..ListQuery::default()
        };
        assert!(q.validate().is_err());
    }

    #[test]
    fn query_dates_parse_from_iso_strings() {
        let q: ListQuery = serde_json::from_value(serde_json::json!({
            "start_date": "2024-01-01",
            "end_date": "2024-02-01"
        }))
        .expect("parse");
        assert_eq!(q.start_date, Some(date!(2024 - 01 - 01)));
        assert_eq!(q.end_date, Some(date!(2024 - 02 - 01)));
    }
}
