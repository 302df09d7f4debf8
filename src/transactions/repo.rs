use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Income,
    Expense,
}

impl TxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Income => "income",
            TxKind::Expense => "expense",
        }
    }
}

/// Transaction record in the database. `amount` is NUMERIC(12,2) so stored
/// values carry exactly two fractional digits.
#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub kind: String,
    pub category: Option<String>,
    pub occurred_on: Date,
    pub note: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated field set for an insert.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Decimal,
    pub kind: TxKind,
    pub category: Option<String>,
    pub occurred_on: Date,
    pub note: Option<String>,
}

/// Fields to change in a partial update. The nullable columns use a double
/// `Option` so "leave alone" (outer `None`) and "clear" (`Some(None)`) stay
/// distinct.
#[derive(Debug, Default, Clone)]
pub struct TxPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub kind: Option<TxKind>,
    pub category: Option<Option<String>>,
    pub occurred_on: Option<Date>,
    pub note: Option<Option<String>>,
}

/// Optional predicates for `list`, AND-combined on top of the mandatory
/// owner scope.
///
/// Caveat on the amount bounds: a value of exactly zero is dropped, so
/// "amount >= 0" cannot be requested through this filter.
#[derive(Debug, Default, Clone)]
pub struct TxFilter {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub kind: Option<TxKind>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

const COLUMNS: &str =
    "id, user_id, description, amount, kind, category, occurred_on, note, created_at, updated_at";

/// Appends the WHERE clause shared by the SELECT and the COUNT so the two
/// can never disagree. The owner predicate is unconditional and comes first;
/// everything else only narrows it.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, owner_id: i64, filter: &TxFilter) {
    qb.push(" WHERE user_id = ").push_bind(owner_id);

    if let Some(d) = filter.start_date {
        qb.push(" AND occurred_on >= ").push_bind(d);
    }
    if let Some(d) = filter.end_date {
        // Inclusive upper bound.
        qb.push(" AND occurred_on <= ").push_bind(d);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(q) = &filter.q {
        let like = format!("%{q}%");
        qb.push(" AND (description ILIKE ")
            .push_bind(like.clone())
            .push(" OR note ILIKE ")
            .push_bind(like)
            .push(")");
    }
    if let Some(min) = filter.min_amount.filter(|v| !v.is_zero()) {
        qb.push(" AND amount >= ").push_bind(min);
    }
    if let Some(max) = filter.max_amount.filter(|v| !v.is_zero()) {
        qb.push(" AND amount <= ").push_bind(max);
    }
}

/// Returns one page of the owner's transactions plus the total match count
/// ignoring limit/offset. Newest `occurred_on` first, id as tie-break.
pub async fn list(
    db: &PgPool,
    owner_id: i64,
    filter: &TxFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(Vec<Transaction>, i64)> {
    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
    push_filter(&mut count_qb, owner_id, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM transactions"));
    push_filter(&mut qb, owner_id, filter);
    qb.push(" ORDER BY occurred_on DESC, id DESC");
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let items = qb
        .build_query_as::<Transaction>()
        .fetch_all(db)
        .await?;

    Ok((items, total))
}

pub async fn insert(
    db: &PgPool,
    owner_id: i64,
    new: &NewTransaction,
) -> anyhow::Result<Transaction> {
    let tx = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, description, amount, kind, category, occurred_on, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, description, amount, kind, category, occurred_on, note,
                  created_at, updated_at
        "#,
    )
    .bind(owner_id)
    .bind(&new.description)
    .bind(new.amount)
    .bind(new.kind.as_str())
    .bind(&new.category)
    .bind(new.occurred_on)
    .bind(&new.note)
    .fetch_one(db)
    .await?;
    Ok(tx)
}

/// `None` covers both "no such row" and "row owned by someone else".
pub async fn get(db: &PgPool, owner_id: i64, id: i64) -> anyhow::Result<Option<Transaction>> {
    let tx = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, user_id, description, amount, kind, category, occurred_on, note,
               created_at, updated_at
        FROM transactions
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(tx)
}

fn build_update(owner_id: i64, id: i64, patch: &TxPatch) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE transactions SET updated_at = now()");
    if let Some(v) = &patch.description {
        qb.push(", description = ").push_bind(v.clone());
    }
    if let Some(v) = patch.amount {
        qb.push(", amount = ").push_bind(v);
    }
    if let Some(v) = patch.kind {
        qb.push(", kind = ").push_bind(v.as_str());
    }
    if let Some(v) = &patch.category {
        qb.push(", category = ").push_bind(v.clone());
    }
    if let Some(v) = patch.occurred_on {
        qb.push(", occurred_on = ").push_bind(v);
    }
    if let Some(v) = &patch.note {
        qb.push(", note = ").push_bind(v.clone());
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" AND user_id = ").push_bind(owner_id);
    qb.push(format!(" RETURNING {COLUMNS}"));
    qb
}

/// Applies the patch in a single UPDATE so the existence/ownership check is
/// atomic with the write. `updated_at` is refreshed on every hit, even for
/// an empty patch.
pub async fn update_partial(
    db: &PgPool,
    owner_id: i64,
    id: i64,
    patch: &TxPatch,
) -> anyhow::Result<Option<Transaction>> {
    let mut qb = build_update(owner_id, id, patch);
    let row = qb
        .build_query_as::<Transaction>()
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Immediate, unrecoverable removal. Returns false when nothing matched.
pub async fn delete(db: &PgPool, owner_id: i64, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
