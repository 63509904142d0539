use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::{Action, Principal, Resource};
use crate::database::Db;
use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::models::farm::{Farm, FarmBody, FarmPatch, FarmRow};
use crate::models::Page;

const COLUMNS: &str = "id, code, born_date, state, gardem_id, seed_id";

/// POST /v1/farms
pub async fn create(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<FarmBody>,
) -> Result<(StatusCode, Json<Farm>), ApiError> {
    principal.require(Resource::Farm, Action::Create)?;
    body.validate()?;

    let mut tx = db.begin().await?;
    let row: FarmRow = sqlx::query_as(&format!(
        "INSERT INTO farms (code, born_date, state, gardem_id, seed_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
    ))
    .bind(&body.code)
    .bind(body.born_date)
    .bind(body.state.as_str())
    .bind(body.gardem_id)
    .bind(body.seed_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(row.into_view()?)))
}

/// GET /v1/farms
pub async fn list(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Farm>>, ApiError> {
    principal.require(Resource::Farm, Action::List)?;

    let (offset, limit) = pagination.clamp();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM farms")
        .fetch_one(db.pool())
        .await?;
    let rows: Vec<FarmRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM farms ORDER BY id OFFSET $1 LIMIT $2"
    ))
    .bind(offset)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;

    let items = rows
        .into_iter()
        .map(FarmRow::into_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(Page::new(count, items)))
}

/// GET /v1/farms/:farm_id
pub async fn retrieve(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Farm>, ApiError> {
    principal.require(Resource::Farm, Action::Retrieve)?;

    let row: Option<FarmRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM farms WHERE id = $1"))
            .bind(id)
            .fetch_optional(db.pool())
            .await?;

    match row {
        Some(row) => Ok(Json(row.into_view()?)),
        None => Err(ApiError::not_found(format!("farm with id {} not found", id))),
    }
}

/// PATCH /v1/farms/:farm_id
pub async fn partial_update(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(patch): Json<FarmPatch>,
) -> Result<Json<Farm>, ApiError> {
    principal.require(Resource::Farm, Action::Update)?;
    patch.validate()?;

    let mut tx = db.begin().await?;
    let existing: Option<FarmRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM farms WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_none() {
        return Err(ApiError::not_found(format!("farm with id {} not found", id)));
    }

    let row = apply_patch(&mut tx, id, &patch).await?;
    tx.commit().await?;

    Ok(Json(row.into_view()?))
}

/// PUT /v1/farms/:farm_id - existence lookup first, then the bifurcated
/// create/update permission check
pub async fn upsert(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(patch): Json<FarmPatch>,
) -> Result<(StatusCode, Json<Farm>), ApiError> {
    patch.validate()?;

    let mut tx = db.begin().await?;
    let existing: Option<FarmRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM farms WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let (status, row) = match existing {
        None => {
            principal.require(Resource::Farm, Action::Create)?;
            let FarmPatch {
                code: Some(code),
                born_date: Some(born_date),
                state: Some(state),
                gardem_id: Some(gardem_id),
                seed_id: Some(seed_id),
            } = patch
            else {
                return Err(ApiError::bad_request(
                    "code, born_date, state, gardem_id and seed_id are required to create a farm",
                ));
            };

            let row: FarmRow = sqlx::query_as(&format!(
                "INSERT INTO farms (id, code, born_date, state, gardem_id, seed_id) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
            ))
            .bind(id)
            .bind(&code)
            .bind(born_date)
            .bind(state.as_str())
            .bind(gardem_id)
            .bind(seed_id)
            .fetch_one(&mut *tx)
            .await?;
            (StatusCode::CREATED, row)
        }
        Some(_) => {
            principal.require(Resource::Farm, Action::Update)?;
            let row = apply_patch(&mut tx, id, &patch).await?;
            (StatusCode::OK, row)
        }
    };
    tx.commit().await?;

    Ok((status, Json(row.into_view()?)))
}

/// DELETE /v1/farms/:farm_id
pub async fn delete(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    principal.require(Resource::Farm, Action::Delete)?;

    let mut tx = db.begin().await?;
    let existing: Option<FarmRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM farms WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_none() {
        return Err(ApiError::not_found(format!("farm with id {} not found", id)));
    }

    sqlx::query("DELETE FROM farms WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn apply_patch(
    tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
    id: i32,
    patch: &FarmPatch,
) -> Result<FarmRow, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE farms SET \
             code = COALESCE($2, code), \
             born_date = COALESCE($3, born_date), \
             state = COALESCE($4, state), \
             gardem_id = COALESCE($5, gardem_id), \
             seed_id = COALESCE($6, seed_id) \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(patch.code.as_deref())
    .bind(patch.born_date)
    .bind(patch.state.map(|s| s.as_str()))
    .bind(patch.gardem_id)
    .bind(patch.seed_id)
    .fetch_one(&mut **tx)
    .await
}
