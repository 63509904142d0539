use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::auth::{Action, Principal, Resource};
use crate::database::Db;
use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::models::seed::{Seed, SeedBody, SeedPatch};
use crate::models::Page;

/// POST /v1/seeds
pub async fn create(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<SeedBody>,
) -> Result<(StatusCode, Json<Seed>), ApiError> {
    principal.require(Resource::Seed, Action::Create)?;
    body.validate()?;

    let mut tx = db.begin().await?;
    let seed: Seed = sqlx::query_as("INSERT INTO seeds (name) VALUES ($1) RETURNING id, name")
        .bind(&body.name)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(seed)))
}

/// GET /v1/seeds
pub async fn list(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<Seed>>, ApiError> {
    principal.require(Resource::Seed, Action::List)?;

    let (offset, limit) = pagination.clamp();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seeds")
        .fetch_one(db.pool())
        .await?;
    let items: Vec<Seed> =
        sqlx::query_as("SELECT id, name FROM seeds ORDER BY id OFFSET $1 LIMIT $2")
            .bind(offset)
            .bind(limit)
            .fetch_all(db.pool())
            .await?;

    Ok(Json(Page::new(count, items)))
}

/// GET /v1/seeds/:id
pub async fn retrieve(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<Seed>, ApiError> {
    principal.require(Resource::Seed, Action::Retrieve)?;

    let seed: Option<Seed> = sqlx::query_as("SELECT id, name FROM seeds WHERE id = $1")
        .bind(id)
        .fetch_optional(db.pool())
        .await?;

    seed.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("seed with id {} not found", id)))
}

/// PATCH /v1/seeds/:id
pub async fn partial_update(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(patch): Json<SeedPatch>,
) -> Result<Json<Seed>, ApiError> {
    principal.require(Resource::Seed, Action::Update)?;
    patch.validate()?;

    let mut tx = db.begin().await?;
    let existing: Option<Seed> = sqlx::query_as("SELECT id, name FROM seeds WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_none() {
        return Err(ApiError::not_found(format!("seed with id {} not found", id)));
    }

    let seed: Seed = sqlx::query_as(
        "UPDATE seeds SET name = COALESCE($2, name) WHERE id = $1 RETURNING id, name",
    )
    .bind(id)
    .bind(patch.name.as_deref())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(seed))
}

/// PUT /v1/seeds/:id - existence lookup first, then the bifurcated
/// create/update permission check
pub async fn upsert(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(patch): Json<SeedPatch>,
) -> Result<(StatusCode, Json<Seed>), ApiError> {
    patch.validate()?;

    let mut tx = db.begin().await?;
    let existing: Option<Seed> = sqlx::query_as("SELECT id, name FROM seeds WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

    let (status, seed) = match existing {
        None => {
            principal.require(Resource::Seed, Action::Create)?;
            let Some(name) = patch.name else {
                return Err(ApiError::bad_request("name is required to create a seed"));
            };

            let seed: Seed =
                sqlx::query_as("INSERT INTO seeds (id, name) VALUES ($1, $2) RETURNING id, name")
                    .bind(id)
                    .bind(&name)
                    .fetch_one(&mut *tx)
                    .await?;
            (StatusCode::CREATED, seed)
        }
        Some(_) => {
            principal.require(Resource::Seed, Action::Update)?;
            let seed: Seed = sqlx::query_as(
                "UPDATE seeds SET name = COALESCE($2, name) WHERE id = $1 RETURNING id, name",
            )
            .bind(id)
            .bind(patch.name.as_deref())
            .fetch_one(&mut *tx)
            .await?;
            (StatusCode::OK, seed)
        }
    };
    tx.commit().await?;

    Ok((status, Json(seed)))
}

/// DELETE /v1/seeds/:id
pub async fn delete(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    principal.require(Resource::Seed, Action::Delete)?;

    let mut tx = db.begin().await?;
    let existing: Option<Seed> = sqlx::query_as("SELECT id, name FROM seeds WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_none() {
        return Err(ApiError::not_found(format!("seed with id {} not found", id)));
    }

    sqlx::query("DELETE FROM seeds WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
