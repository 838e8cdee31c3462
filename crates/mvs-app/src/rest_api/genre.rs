use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use http::StatusCode;
use mvs_dal::genre::{CreateGenre, GenreRepository, UpdateGenre};

use crate::error::{ApiError, ApiResult};
use crate::rest_api::{parse_id, IdQuery};
use crate::state::AppState;
use crate::validate::Garde;

crate::repository_from_request!(GenreRepository);

pub async fn create(
    repository: GenreRepository,
    Garde(Json(payload)): Garde<Json<CreateGenre>>,
) -> ApiResult<impl IntoResponse> {
    repository.create(payload).await?;
    Ok(StatusCode::CREATED)
}

pub async fn update(
    Query(query): Query<IdQuery>,
    repository: GenreRepository,
    Garde(Json(payload)): Garde<Json<UpdateGenre>>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&query.id)?;
    // an unknown id is reported as a generic failure on this endpoint
    let record = repository.update(id, payload).await.map_err(|e| match e {
        mvs_dal::Error::RecordNotFound(what) => {
            ApiError::Internal(anyhow::anyhow!("update failed: {what}"))
        }
        other => other.into(),
    })?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn remove(
    Query(query): Query<IdQuery>,
    repository: GenreRepository,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&query.id)?;
    repository.delete(id).await?;
    Ok(StatusCode::OK)
}

pub async fn details(
    Query(query): Query<IdQuery>,
    repository: GenreRepository,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&query.id)?;
    let record = repository.get(id).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn list(repository: GenreRepository) -> ApiResult<impl IntoResponse> {
    let records = repository.list_all().await?;
    Ok((StatusCode::OK, Json(records)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/update", put(update))
        .route("/delete", delete(remove))
        .route("/details", get(details))
        .route("/list", get(list))
}
