use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;

use crate::auth::{Action, Principal, Resource};
use crate::database::Db;
use crate::error::ApiError;
use crate::handlers::Pagination;
use crate::models::farm_note::{FarmNote, FarmNoteBody, FarmNotePatch, FarmNoteRow};
use crate::models::Page;

const COLUMNS: &str = "id, farm_id, created_at, note, note_type, value";

/// POST /v1/farms/:farm_id/notes
///
/// `farm_id` comes from the path only; a nonexistent farm surfaces as a
/// foreign-key conflict.
pub async fn create(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(farm_id): Path<i32>,
    Json(body): Json<FarmNoteBody>,
) -> Result<(StatusCode, Json<FarmNote>), ApiError> {
    principal.require(Resource::FarmNote, Action::Create)?;

    let mut tx = db.begin().await?;
    let row: FarmNoteRow = sqlx::query_as(&format!(
        "INSERT INTO farm_notes (farm_id, note, note_type, value) \
         VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    ))
    .bind(farm_id)
    .bind(&body.note)
    .bind(body.note_type.as_str())
    .bind(body.value)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(row.into_view()?)))
}

/// GET /v1/farms/:farm_id/notes
pub async fn list(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path(farm_id): Path<i32>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<FarmNote>>, ApiError> {
    principal.require(Resource::FarmNote, Action::List)?;

    let (offset, limit) = pagination.clamp();
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM farm_notes WHERE farm_id = $1")
        .bind(farm_id)
        .fetch_one(db.pool())
        .await?;
    let rows: Vec<FarmNoteRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM farm_notes WHERE farm_id = $1 ORDER BY id OFFSET $2 LIMIT $3"
    ))
    .bind(farm_id)
    .bind(offset)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;

    let items = rows
        .into_iter()
        .map(FarmNoteRow::into_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(Page::new(count, items)))
}

/// GET /v1/farms/:farm_id/notes/:id
pub async fn retrieve(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path((farm_id, id)): Path<(i32, i32)>,
) -> Result<Json<FarmNote>, ApiError> {
    principal.require(Resource::FarmNote, Action::Retrieve)?;

    let row: Option<FarmNoteRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM farm_notes WHERE id = $1 AND farm_id = $2"
    ))
    .bind(id)
    .bind(farm_id)
    .fetch_optional(db.pool())
    .await?;

    match row {
        Some(row) => Ok(Json(row.into_view()?)),
        None => Err(not_found(farm_id, id)),
    }
}

/// PATCH /v1/farms/:farm_id/notes/:id
pub async fn partial_update(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path((farm_id, id)): Path<(i32, i32)>,
    Json(patch): Json<FarmNotePatch>,
) -> Result<Json<FarmNote>, ApiError> {
    principal.require(Resource::FarmNote, Action::Update)?;

    let mut tx = db.begin().await?;
    let existing: Option<FarmNoteRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM farm_notes WHERE id = $1 AND farm_id = $2"
    ))
    .bind(id)
    .bind(farm_id)
    .fetch_optional(&mut *tx)
    .await?;
    if existing.is_none() {
        return Err(not_found(farm_id, id));
    }

    let row = apply_patch(&mut tx, farm_id, id, &patch).await?;
    tx.commit().await?;

    Ok(Json(row.into_view()?))
}

/// PUT /v1/farms/:farm_id/notes/:id - existence lookup first, then the
/// bifurcated create/update permission check
pub async fn upsert(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path((farm_id, id)): Path<(i32, i32)>,
    Json(patch): Json<FarmNotePatch>,
) -> Result<(StatusCode, Json<FarmNote>), ApiError> {
    let mut tx = db.begin().await?;
    let existing: Option<FarmNoteRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM farm_notes WHERE id = $1 AND farm_id = $2"
    ))
    .bind(id)
    .bind(farm_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (status, row) = match existing {
        None => {
            principal.require(Resource::FarmNote, Action::Create)?;
            let Some(note) = patch.note else {
                return Err(ApiError::bad_request("note is required to create a note"));
            };
            let note_type = patch.note_type.unwrap_or_default();
            let value = patch.value.unwrap_or(Decimal::ZERO);

            let row: FarmNoteRow = sqlx::query_as(&format!(
                "INSERT INTO farm_notes (id, farm_id, note, note_type, value) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
            ))
            .bind(id)
            .bind(farm_id)
            .bind(&note)
            .bind(note_type.as_str())
            .bind(value)
            .fetch_one(&mut *tx)
            .await?;
            (StatusCode::CREATED, row)
        }
        Some(_) => {
            principal.require(Resource::FarmNote, Action::Update)?;
            let row = apply_patch(&mut tx, farm_id, id, &patch).await?;
            (StatusCode::OK, row)
        }
    };
    tx.commit().await?;

    Ok((status, Json(row.into_view()?)))
}

/// DELETE /v1/farms/:farm_id/notes/:id
pub async fn delete(
    State(db): State<Db>,
    Extension(principal): Extension<Principal>,
    Path((farm_id, id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    principal.require(Resource::FarmNote, Action::Delete)?;

    let mut tx = db.begin().await?;
    let existing: Option<FarmNoteRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM farm_notes WHERE id = $1 AND farm_id = $2"
    ))
    .bind(id)
    .bind(farm_id)
    .fetch_optional(&mut *tx)
    .await?;
    if existing.is_none() {
        return Err(not_found(farm_id, id));
    }

    sqlx::query("DELETE FROM farm_notes WHERE id = $1 AND farm_id = $2")
        .bind(id)
        .bind(farm_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

fn not_found(farm_id: i32, id: i32) -> ApiError {
    ApiError::not_found(format!("note {} not found on farm {}", id, farm_id))
}

async fn apply_patch(
    tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
    farm_id: i32,
    id: i32,
    patch: &FarmNotePatch,
) -> Result<FarmNoteRow, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE farm_notes SET \
             note = COALESCE($3, note), \
             note_type = COALESCE($4, note_type), \
             value = COALESCE($5, value) \
         WHERE id = $1 AND farm_id = $2 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(farm_id)
    .bind(patch.note.as_deref())
    .bind(patch.note_type.map(|t| t.as_str()))
    .bind(patch.value)
    .fetch_one(&mut **tx)
    .await
}
