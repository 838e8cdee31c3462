use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use garde::Validate;
use http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use mvs_dal::movie::{
    optional_release_year_in_range, CreateMovie, MovieFilter, MovieRepository, MovieSort,
    UpdateMovie,
};
use mvs_dal::SortDirection;

use crate::error::{ApiError, ApiResult};
use crate::rest_api::{parse_id, IdQuery};
use crate::state::AppState;
use crate::validate::Garde;

crate::repository_from_request!(MovieRepository);

/// Filter, sort and pagination criteria of the listing endpoint, all
/// optional and validated together so every violation is reported at once.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MovieListQuery {
    #[garde(length(min = 2, max = 50))]
    original_name: Option<String>,
    #[garde(length(min = 2, max = 50))]
    localized_name: Option<String>,
    #[garde(custom(optional_release_year_in_range))]
    release_year: Option<i32>,
    #[garde(range(min = 0.0, max = 10.0))]
    rating: Option<f32>,
    /// Comma-separated genre ids.
    #[garde(custom(uuid_list))]
    genres: Option<String>,
    #[garde(range(min = 0))]
    take: Option<i64>,
    #[garde(range(min = 0))]
    skip: Option<i64>,
    #[garde(custom(sort_direction))]
    rating_sort: Option<String>,
    #[garde(custom(sort_direction))]
    release_year_sort: Option<String>,
}

// Custom rules receive the `Option` itself, absent values pass.
fn uuid_list(value: &Option<String>, _context: &()) -> garde::Result {
    let Some(value) = value else { return Ok(()) };
    for token in value.split(',') {
        if Uuid::parse_str(token.trim()).is_err() {
            return Err(garde::Error::new(format!("'{token}' is not a valid UUID")));
        }
    }
    Ok(())
}

fn sort_direction(value: &Option<String>, _context: &()) -> garde::Result {
    let Some(value) = value else { return Ok(()) };
    value
        .parse::<SortDirection>()
        .map(|_| ())
        .map_err(|_| garde::Error::new("must be one of ASC, DESC"))
}

impl MovieListQuery {
    fn into_parts(self) -> ApiResult<(MovieFilter, MovieSort)> {
        let genres = self
            .genres
            .map(|raw| {
                raw.split(',')
                    .map(|token| parse_id(token.trim()))
                    .collect::<ApiResult<Vec<_>>>()
            })
            .transpose()?;

        let sort = MovieSort {
            rating: parse_sort(self.rating_sort)?,
            release_year: parse_sort(self.release_year_sort)?,
        };

        let filter = MovieFilter {
            original_name: self.original_name,
            localized_name: self.localized_name,
            release_year: self.release_year,
            rating: self.rating,
            genres,
            take: self.take,
            skip: self.skip,
        };
        Ok((filter, sort))
    }
}

fn parse_sort(raw: Option<String>) -> ApiResult<Option<SortDirection>> {
    raw.map(|value| {
        value.parse::<SortDirection>().map_err(|_| {
            ApiError::Validation(serde_json::json!([
                { "field": "sort", "message": "must be one of ASC, DESC" }
            ]))
        })
    })
    .transpose()
}

pub async fn create(
    repository: MovieRepository,
    Garde(Json(payload)): Garde<Json<CreateMovie>>,
) -> ApiResult<impl IntoResponse> {
    repository.create(payload).await?;
    Ok(StatusCode::CREATED)
}

pub async fn update(
    Query(query): Query<IdQuery>,
    repository: MovieRepository,
    Garde(Json(payload)): Garde<Json<UpdateMovie>>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&query.id)?;
    let record = repository.update(id, payload).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn remove(
    Query(query): Query<IdQuery>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&query.id)?;
    repository.delete(id).await?;
    Ok(StatusCode::OK)
}

pub async fn details(
    Query(query): Query<IdQuery>,
    repository: MovieRepository,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&query.id)?;
    let record = repository.get(id).await?;
    Ok((StatusCode::OK, Json(record)))
}

pub async fn list(
    repository: MovieRepository,
    Garde(Query(params)): Garde<Query<MovieListQuery>>,
) -> ApiResult<impl IntoResponse> {
    let (filter, sort) = params.into_parts()?;
    let records = repository.list(filter, sort).await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query_from(value: serde_json::Value) -> MovieListQuery {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_list_query_rules() {
        // all criteria optional, an empty query is valid
        assert!(query_from(json!({})).validate().is_ok());
        assert!(query_from(json!({"rating_sort": "DESC", "release_year_sort": "ASC"}))
            .validate()
            .is_ok());
        assert!(query_from(json!({"rating_sort": "UPWARDS"}))
            .validate()
            .is_err());

        let genres = Uuid::new_v4().to_string();
        assert!(query_from(json!({ "genres": genres })).validate().is_ok());
        assert!(query_from(json!({"genres": "not-a-uuid"}))
            .validate()
            .is_err());

        assert!(query_from(json!({"release_year": 2009})).validate().is_ok());
        assert!(query_from(json!({"release_year": 1500}))
            .validate()
            .is_err());
    }
}
