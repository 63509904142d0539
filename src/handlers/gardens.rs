use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::{Action, Principal, Resource};
use crate::database::Db;
use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::models::garden::{Garden, GardenBody, GardenPatch};
use crate::models::Page;

/// POST /v1/gardens
pub async fn create(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<GardenBody>,
) -> Result<(StatusCode, Json<Garden>), ApiError> {
    principal.require(Resource::Garden, Action::Create)?;
    body.validate()?;

    let mut tx = db.begin().await?;
    let garden: Garden =
        sqlx::query_as("INSERT INTO gardens (code, size) VALUES ($1, $2) RETURNING id, code, size")
            .bind(&body.code)
            .bind(body.size)
            .fetch_one(&mut *tx)
            .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(garden)))
}

/// GET /v1/gardens
pub async fn list(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Garden>>, ApiError> {
    principal.require(Resource::Garden, Action::List)?;

    let (offset, limit) = pagination.clamp();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM gardens")
        .fetch_one(db.pool())
        .await?;
    let items: Vec<Garden> =
        sqlx::query_as("SELECT id, code, size FROM gardens ORDER BY id OFFSET $1 LIMIT $2")
            .bind(offset)
            .bind(limit)
            .fetch_all(db.pool())
            .await?;

    Ok(Json(Page::new(count, items)))
}

/// GET /v1/gardens/:id
pub async fn retrieve(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Garden>, ApiError> {
    principal.require(Resource::Garden, Action::Retrieve)?;

    let garden: Option<Garden> =
        sqlx::query_as("SELECT id, code, size FROM gardens WHERE id = $1")
            .bind(id)
            .fetch_optional(db.pool())
            .await?;

    garden
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("garden with id {} not found", id)))
}

/// PATCH /v1/gardens/:id
pub async fn partial_update(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(patch): Json<GardenPatch>,
) -> Result<Json<Garden>, ApiError> {
    principal.require(Resource::Garden, Action::Update)?;
    patch.validate()?;

    let mut tx = db.begin().await?;
    let existing: Option<Garden> =
        sqlx::query_as("SELECT id, code, size FROM gardens WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_none() {
        return Err(ApiError::not_found(format!("garden with id {} not found", id)));
    }

    let garden: Garden = sqlx::query_as(
        "UPDATE gardens SET code = COALESCE($2, code), size = COALESCE($3, size) \
         WHERE id = $1 RETURNING id, code, size",
    )
    .bind(id)
    .bind(patch.code.as_deref())
    .bind(patch.size)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(garden))
}

/// PUT /v1/gardens/:id
///
/// Existence decides which capability gates the call: absent rows need
/// create, present rows need update. The lookup therefore runs before any
/// permission check.
pub async fn upsert(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(patch): Json<GardenPatch>,
) -> Result<(StatusCode, Json<Garden>), ApiError> {
    patch.validate()?;

    let mut tx = db.begin().await?;
    let existing: Option<Garden> =
        sqlx::query_as("SELECT id, code, size FROM gardens WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

    let (status, garden) = match existing {
        None => {
            principal.require(Resource::Garden, Action::Create)?;
            let GardenPatch {
                code: Some(code),
                size: Some(size),
            } = patch
            else {
                return Err(ApiError::bad_request(
                    "code and size are required to create a garden",
                ));
            };

            let garden: Garden = sqlx::query_as(
                "INSERT INTO gardens (id, code, size) VALUES ($1, $2, $3) RETURNING id, code, size",
            )
            .bind(id)
            .bind(&code)
            .bind(size)
            .fetch_one(&mut *tx)
            .await?;
            (StatusCode::CREATED, garden)
        }
        Some(_) => {
            principal.require(Resource::Garden, Action::Update)?;
            let garden: Garden = sqlx::query_as(
                "UPDATE gardens SET code = COALESCE($2, code), size = COALESCE($3, size) \
                 WHERE id = $1 RETURNING id, code, size",
            )
            .bind(id)
            .bind(patch.code.as_deref())
            .bind(patch.size)
            .fetch_one(&mut *tx)
            .await?;
            (StatusCode::OK, garden)
        }
    };
    tx.commit().await?;

    Ok((status, Json(garden)))
}

/// DELETE /v1/gardens/:id
pub async fn delete(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    principal.require(Resource::Garden, Action::Delete)?;

    let mut tx = db.begin().await?;
    let existing: Option<Garden> =
        sqlx::query_as("SELECT id, code, size FROM gardens WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    if existing.is_none() {
        return Err(ApiError::not_found(format!("garden with id {} not found", id)));
    }

    sqlx::query("DELETE FROM gardens WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
