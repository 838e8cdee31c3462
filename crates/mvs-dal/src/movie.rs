use std::collections::HashMap;

use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, QueryBuilder};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::genre::Genre;
use crate::SortDirection;

pub const MIN_RELEASE_YEAR: i32 = 1800;

/// Upper bound is dynamic - announced releases may be up to 20 years out.
pub fn release_year_in_range(value: &i32, _context: &()) -> garde::Result {
    let max_year = OffsetDateTime::now_utc().year() + 20;
    if *value < MIN_RELEASE_YEAR || *value > max_year {
        return Err(garde::Error::new(format!(
            "release year must be between {MIN_RELEASE_YEAR} and {max_year}"
        )));
    }
    Ok(())
}

/// Custom rules see the `Option` itself, absent values pass.
pub fn optional_release_year_in_range(value: &Option<i32>, context: &()) -> garde::Result {
    match value {
        Some(year) => release_year_in_range(year, context),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateMovie {
    #[garde(length(min = 2, max = 50))]
    pub original_name: String,
    #[garde(length(min = 2, max = 50))]
    pub localized_name: String,
    #[garde(custom(release_year_in_range))]
    pub release_year: i32,
    #[garde(range(min = 0.0, max = 10.0))]
    pub rating: Option<f32>,
    #[garde(length(min = 10, max = 5000))]
    pub description: String,
    #[garde(skip)]
    #[serde(default)]
    pub genres: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, Validate)]
pub struct UpdateMovie {
    #[garde(length(min = 2, max = 50))]
    pub original_name: Option<String>,
    #[garde(length(min = 2, max = 50))]
    pub localized_name: Option<String>,
    #[garde(custom(optional_release_year_in_range))]
    pub release_year: Option<i32>,
    #[garde(range(min = 0.0, max = 10.0))]
    pub rating: Option<f32>,
    #[garde(length(min = 10, max = 5000))]
    pub description: Option<String>,
    /// When present the whole association set is replaced, never merged.
    #[garde(skip)]
    pub genres: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Movie {
    pub id: Uuid,
    pub original_name: String,
    pub localized_name: String,
    pub release_year: i32,
    pub rating: Option<f32>,
    pub description: String,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub original_name: Option<String>,
    pub localized_name: Option<String>,
    pub release_year: Option<i32>,
    pub rating: Option<f32>,
    pub genres: Option<Vec<Uuid>>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MovieSort {
    pub rating: Option<SortDirection>,
    pub release_year: Option<SortDirection>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    original_name: String,
    localized_name: String,
    release_year: i32,
    rating: Option<f32>,
    description: String,
}

impl MovieRow {
    fn into_movie(self, genres: Vec<Genre>) -> Movie {
        Movie {
            id: self.id,
            original_name: self.original_name,
            localized_name: self.localized_name,
            release_year: self.release_year,
            rating: self.rating,
            description: self.description,
            genres,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MovieGenreRow {
    movie_id: Uuid,
    id: Uuid,
    name: String,
    description: String,
}

const SELECT_MOVIE: &str = "SELECT m.id, m.original_name, m.localized_name, m.release_year, \
     m.rating, m.description FROM movie m";

pub type MovieRepository = MovieRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Genre ids that do not resolve to stored genres are dropped, not rejected.
    pub async fn create(&self, payload: CreateMovie) -> Result<Movie> {
        let id = Uuid::new_v4();
        let genres = self.resolve_genres(&payload.genres).await?;

        sqlx::query(
            "INSERT INTO movie (id, original_name, localized_name, release_year, rating, description) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&payload.original_name)
        .bind(&payload.localized_name)
        .bind(payload.release_year)
        .bind(payload.rating)
        .bind(&payload.description)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::from_db("movie", e))?;

        self.write_genre_links(id, &genres).await?;
        self.get_existing(id).await
    }

    pub async fn update(&self, id: Uuid, payload: UpdateMovie) -> Result<Movie> {
        let result = sqlx::query(
            "UPDATE movie SET \
             original_name = COALESCE(?, original_name), \
             localized_name = COALESCE(?, localized_name), \
             release_year = COALESCE(?, release_year), \
             rating = COALESCE(?, rating), \
             description = COALESCE(?, description) \
             WHERE id = ?",
        )
        .bind(&payload.original_name)
        .bind(&payload.localized_name)
        .bind(payload.release_year)
        .bind(payload.rating)
        .bind(&payload.description)
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::from_db("movie", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::RecordNotFound(format!("movie {id}")));
        }

        if let Some(genre_ids) = &payload.genres {
            let genres = self.resolve_genres(genre_ids).await?;
            sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?")
                .bind(id)
                .execute(&self.executor)
                .await?;
            self.write_genre_links(id, &genres).await?;
        }

        self.get_existing(id).await
    }

    /// Deleting an id with no record is not an error.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM movie_genres WHERE movie_id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        sqlx::query("DELETE FROM movie WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!("{SELECT_MOVIE} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;

        match row {
            Some(row) => {
                let mut genre_map = self.genres_for_movies(&[id], None).await?;
                Ok(Some(
                    row.into_movie(genre_map.remove(&id).unwrap_or_default()),
                ))
            }
            None => Ok(None),
        }
    }

    /// Composes a single listing query from independently optional filter,
    /// sort and pagination criteria, all AND-conjoined and parameter-bound.
    pub async fn list(&self, filter: MovieFilter, sort: MovieSort) -> Result<Vec<Movie>> {
        let rows = self.select_movie_rows(&filter, &sort).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut genre_map = self
            .genres_for_movies(&ids, filter.genres.as_deref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let genres = genre_map.remove(&row.id).unwrap_or_default();
                row.into_movie(genres)
            })
            .collect())
    }

    async fn select_movie_rows(
        &self,
        filter: &MovieFilter,
        sort: &MovieSort,
    ) -> Result<Vec<MovieRow>> {
        let mut query = QueryBuilder::<crate::ChosenDB>::new(SELECT_MOVIE);
        query.push(" WHERE 1 = 1");

        if let Some(genre_ids) = filter.genres.as_deref().filter(|ids| !ids.is_empty()) {
            query.push(" AND m.id IN (SELECT mg.movie_id FROM movie_genres mg WHERE mg.genre_id IN (");
            let mut ids = query.separated(", ");
            for genre_id in genre_ids {
                ids.push_bind(*genre_id);
            }
            ids.push_unseparated("))");
        }

        if let Some(name) = &filter.original_name {
            query.push(" AND LOWER(m.original_name) LIKE ");
            query.push_bind(contains_pattern(name));
        }

        if let Some(name) = &filter.localized_name {
            query.push(" AND LOWER(m.localized_name) LIKE ");
            query.push_bind(contains_pattern(name));
        }

        if let Some(rating) = filter.rating {
            query.push(" AND m.rating = ");
            query.push_bind(rating);
        }

        if let Some(year) = filter.release_year {
            query.push(" AND m.release_year = ");
            query.push_bind(year);
        }

        // Rating takes precedence over release year; the trailing id key
        // keeps pagination deterministic.
        query.push(" ORDER BY");
        if let Some(direction) = sort.rating {
            query.push(" m.rating ");
            query.push(direction.as_sql());
            query.push(",");
        }
        if let Some(direction) = sort.release_year {
            query.push(" m.release_year ");
            query.push(direction.as_sql());
            query.push(",");
        }
        query.push(" m.id");

        if let Some(take) = filter.take {
            query.push(" LIMIT ");
            query.push_bind(take);
        }
        if let Some(skip) = filter.skip {
            if filter.take.is_none() {
                // SQLite accepts OFFSET only after a LIMIT clause
                query.push(" LIMIT -1");
            }
            query.push(" OFFSET ");
            query.push_bind(skip);
        }

        debug!("Movie listing query: {}", query.sql());
        let rows = query
            .build_query_as::<MovieRow>()
            .fetch_all(&self.executor)
            .await?;
        Ok(rows)
    }

    async fn resolve_genres(&self, requested: &[Uuid]) -> Result<Vec<Genre>> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }
        let mut query =
            QueryBuilder::<crate::ChosenDB>::new("SELECT id, name, description FROM genre WHERE id IN (");
        let mut ids = query.separated(", ");
        for genre_id in requested {
            ids.push_bind(*genre_id);
        }
        ids.push_unseparated(")");

        let genres = query
            .build_query_as::<Genre>()
            .fetch_all(&self.executor)
            .await?;
        if genres.len() != requested.len() {
            debug!(
                "Dropped {} unknown genre id(s) from request",
                requested.len() - genres.len()
            );
        }
        Ok(genres)
    }

    async fn write_genre_links(&self, movie_id: Uuid, genres: &[Genre]) -> Result<()> {
        if genres.is_empty() {
            return Ok(());
        }
        let mut query =
            QueryBuilder::<crate::ChosenDB>::new("INSERT INTO movie_genres (movie_id, genre_id) ");
        query.push_values(genres, |mut row, genre| {
            row.push_bind(movie_id).push_bind(genre.id);
        });
        query.build().execute(&self.executor).await?;
        Ok(())
    }

    /// Loads genre sets for a batch of movies with one query; `only` narrows
    /// the returned sets to the filtered genre ids.
    async fn genres_for_movies(
        &self,
        movie_ids: &[Uuid],
        only: Option<&[Uuid]>,
    ) -> Result<HashMap<Uuid, Vec<Genre>>> {
        let mut query = QueryBuilder::<crate::ChosenDB>::new(
            "SELECT mg.movie_id, g.id, g.name, g.description FROM movie_genres mg \
             JOIN genre g ON g.id = mg.genre_id WHERE mg.movie_id IN (",
        );
        let mut ids = query.separated(", ");
        for movie_id in movie_ids {
            ids.push_bind(*movie_id);
        }
        ids.push_unseparated(")");

        if let Some(genre_ids) = only.filter(|ids| !ids.is_empty()) {
            query.push(" AND g.id IN (");
            let mut ids = query.separated(", ");
            for genre_id in genre_ids {
                ids.push_bind(*genre_id);
            }
            ids.push_unseparated(")");
        }
        query.push(" ORDER BY g.name");

        let rows = query
            .build_query_as::<MovieGenreRow>()
            .fetch_all(&self.executor)
            .await?;

        let mut by_movie: HashMap<Uuid, Vec<Genre>> = HashMap::new();
        for row in rows {
            by_movie.entry(row.movie_id).or_default().push(Genre {
                id: row.id,
                name: row.name,
                description: row.description,
            });
        }
        Ok(by_movie)
    }

    async fn get_existing(&self, id: Uuid) -> Result<Movie> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("movie {id}")))
    }
}

fn contains_pattern(name: &str) -> String {
    format!("%{}%", name.to_lowercase())
}
