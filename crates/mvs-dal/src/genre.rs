use futures::{StreamExt as _, TryStreamExt as _};
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::Pool;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct CreateGenre {
    #[garde(length(min = 3, max = 15))]
    pub name: String,
    #[garde(length(min = 10, max = 5000))]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct UpdateGenre {
    #[garde(length(min = 3, max = 15))]
    pub name: Option<String>,
    #[garde(length(min = 10, max = 5000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

pub type GenreRepository = GenreRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct GenreRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> GenreRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateGenre) -> Result<Genre> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO genre (id, name, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&payload.name)
            .bind(&payload.description)
            .execute(&self.executor)
            .await
            .map_err(|e| Error::from_db("genre.name", e))?;

        self.get_existing(id).await
    }

    /// Partial update - fields left out of the payload keep their stored value.
    pub async fn update(&self, id: Uuid, payload: UpdateGenre) -> Result<Genre> {
        let result = sqlx::query(
            "UPDATE genre SET name = COALESCE(?, name), description = COALESCE(?, description) \
             WHERE id = ?",
        )
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(id)
        .execute(&self.executor)
        .await
        .map_err(|e| Error::from_db("genre.name", e))?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound(format!("genre {id}")))
        } else {
            self.get_existing(id).await
        }
    }

    /// Deleting an id with no record is not an error.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM genre WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Genre>> {
        let record =
            sqlx::query_as::<_, Genre>("SELECT id, name, description FROM genre WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.executor)
                .await?;
        Ok(record)
    }

    pub async fn list_all(&self) -> Result<Vec<Genre>> {
        let records = sqlx::query_as::<_, Genre>("SELECT id, name, description FROM genre")
            .fetch(&self.executor)
            .take(crate::MAX_LIMIT)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(records)
    }

    async fn get_existing(&self, id: Uuid) -> Result<Genre> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("genre {id}")))
    }
}
