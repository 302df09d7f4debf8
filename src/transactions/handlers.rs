use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::extractors::CurrentUser,
    error::ApiError,
    state::AppState,
    transactions::{
        dto::{CreateTransaction, ListQuery, TransactionList, TransactionOut, UpdateTransaction},
        repo,
    },
};

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

#[instrument(skip(state, user, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<TransactionOut>), ApiError> {
    let new = payload.validate()?;
    let tx = repo::insert(&state.db, user.id, &new).await?;
    info!(user_id = %user.id, tx_id = %tx.id, "transaction created");
    Ok((StatusCode::CREATED, Json(tx.into())))
}

#[instrument(skip(state, user))]
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<TransactionList>, ApiError> {
    let (limit, offset, filter) = params.validate()?;
    let (items, total) = repo::list(&state.db, user.id, &filter, limit, offset).await?;
    Ok(Json(TransactionList {
        items: items.into_iter().map(Into::into).collect(),
        total,
        limit,
        offset,
    }))
}

#[instrument(skip(state, user))]
pub async fn get_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<TransactionOut>, ApiError> {
    let tx = repo::get(&state.db, user.id, id)
        .await?
        .ok_or(ApiError::NotFound("Transaction"))?;
    Ok(Json(tx.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTransaction>,
) -> Result<Json<TransactionOut>, ApiError> {
    let patch = payload.validate()?;
    let tx = repo::update_partial(&state.db, user.id, id, &patch)
        .await?
        .ok_or(ApiError::NotFound("Transaction"))?;
    info!(user_id = %user.id, tx_id = %tx.id, "transaction updated");
    Ok(Json(tx.into()))
}

#[instrument(skip(state, user))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("Transaction"));
    }
    info!(user_id = %user.id, tx_id = %id, "transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}
