use mvs_dal::genre::{CreateGenre, Genre, GenreRepositoryImpl};
use mvs_dal::movie::{
    CreateMovie, Movie, MovieFilter, MovieRepositoryImpl, MovieSort, UpdateMovie,
};
use mvs_dal::{Error, SortDirection};
use sqlx::Executor;
use uuid::Uuid;

async fn init_db() -> sqlx::Pool<sqlx::Sqlite> {
    const DB_URL: &str = "sqlite::memory:";
    let conn = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect(DB_URL)
        .await
        .unwrap();
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    sqlx::migrate!("../../migrations").run(&conn).await.unwrap();

    conn
}

async fn seed_genre(conn: &sqlx::Pool<sqlx::Sqlite>, name: &str) -> Genre {
    let repo = GenreRepositoryImpl::new(conn.clone());
    repo.create(CreateGenre {
        name: name.to_string(),
        description: format!("Movies in the {name} genre"),
    })
    .await
    .unwrap()
}

fn new_movie(name: &str, year: i32, rating: Option<f32>, genres: Vec<Uuid>) -> CreateMovie {
    CreateMovie {
        original_name: name.to_string(),
        localized_name: format!("{name} (localized)"),
        release_year: year,
        rating,
        description: format!("A long enough synopsis of the movie {name}"),
        genres,
    }
}

async fn seed_catalogue(conn: &sqlx::Pool<sqlx::Sqlite>) -> (Movie, Movie, Genre, Genre) {
    let adventure = seed_genre(conn, "Adventure").await;
    let family = seed_genre(conn, "Family").await;
    let repo = MovieRepositoryImpl::new(conn.clone());
    let up = repo
        .create(new_movie("Up", 2009, Some(8.2), vec![adventure.id]))
        .await
        .unwrap();
    let cars = repo
        .create(new_movie("Cars", 2006, Some(7.1), vec![family.id]))
        .await
        .unwrap();
    (up, cars, adventure, family)
}

#[tokio::test]
async fn test_movie_create() {
    let conn = init_db().await;
    let adventure = seed_genre(&conn, "Adventure").await;
    let family = seed_genre(&conn, "Family").await;
    let repo = MovieRepositoryImpl::new(conn);

    let unknown = Uuid::new_v4();
    let movie = repo
        .create(new_movie(
            "Up",
            2009,
            Some(8.2),
            vec![adventure.id, family.id, unknown],
        ))
        .await
        .unwrap();

    assert_eq!(movie.original_name, "Up");
    assert_eq!(movie.localized_name, "Up (localized)");
    assert_eq!(movie.release_year, 2009);
    assert_eq!(movie.rating, Some(8.2));
    // unresolvable genre ids are dropped, not rejected
    let mut genre_ids: Vec<Uuid> = movie.genres.iter().map(|g| g.id).collect();
    genre_ids.sort();
    let mut expected = vec![adventure.id, family.id];
    expected.sort();
    assert_eq!(genre_ids, expected);

    let fetched = repo.get(movie.id).await.unwrap().unwrap();
    assert_eq!(fetched.genres.len(), 2);
}

#[tokio::test]
async fn test_movie_update_partial() {
    let conn = init_db().await;
    let (up, _, adventure, _) = seed_catalogue(&conn).await;
    let repo = MovieRepositoryImpl::new(conn);

    let updated = repo
        .update(
            up.id,
            UpdateMovie {
                rating: Some(9.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.rating, Some(9.0));
    assert_eq!(updated.original_name, "Up");
    assert_eq!(updated.release_year, 2009);
    // genres untouched when omitted from the payload
    assert_eq!(updated.genres.len(), 1);
    assert_eq!(updated.genres[0].id, adventure.id);
}

#[tokio::test]
async fn test_movie_update_replaces_genres() {
    let conn = init_db().await;
    let adventure = seed_genre(&conn, "Adventure").await;
    let family = seed_genre(&conn, "Family").await;
    let comedy = seed_genre(&conn, "Comedy").await;
    let repo = MovieRepositoryImpl::new(conn);

    let movie = repo
        .create(new_movie(
            "Up",
            2009,
            Some(8.2),
            vec![adventure.id, family.id],
        ))
        .await
        .unwrap();
    assert_eq!(movie.genres.len(), 2);

    let updated = repo
        .update(
            movie.id,
            UpdateMovie {
                genres: Some(vec![comedy.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // the whole association set is replaced, not merged
    assert_eq!(updated.genres.len(), 1);
    assert_eq!(updated.genres[0].id, comedy.id);
}

#[tokio::test]
async fn test_movie_update_missing_id() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    let result = repo
        .update(
            Uuid::new_v4(),
            UpdateMovie {
                rating: Some(5.0),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::RecordNotFound(_))));
}

#[tokio::test]
async fn test_movie_delete_idempotent() {
    let conn = init_db().await;
    let (up, _, _, _) = seed_catalogue(&conn).await;
    let repo = MovieRepositoryImpl::new(conn);

    repo.delete(up.id).await.unwrap();
    assert!(repo.get(up.id).await.unwrap().is_none());
    repo.delete(up.id).await.unwrap();
}

#[tokio::test]
async fn test_list_genre_filter() {
    let conn = init_db().await;
    let (up, _, adventure, _) = seed_catalogue(&conn).await;
    let repo = MovieRepositoryImpl::new(conn);

    let filter = MovieFilter {
        genres: Some(vec![adventure.id]),
        ..Default::default()
    };
    let movies = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, up.id);
    assert_eq!(movies[0].genres.len(), 1);
    assert_eq!(movies[0].genres[0].id, adventure.id);
}

#[tokio::test]
async fn test_list_name_filters() {
    let conn = init_db().await;
    let (_, cars, _, _) = seed_catalogue(&conn).await;
    let repo = MovieRepositoryImpl::new(conn);

    // substring, case-insensitive
    let filter = MovieFilter {
        original_name: Some("AR".to_string()),
        ..Default::default()
    };
    let movies = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, cars.id);

    let filter = MovieFilter {
        localized_name: Some("cars".to_string()),
        ..Default::default()
    };
    let movies = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, cars.id);
}

#[tokio::test]
async fn test_list_exact_filters() {
    let conn = init_db().await;
    let (up, cars, _, _) = seed_catalogue(&conn).await;
    let repo = MovieRepositoryImpl::new(conn);

    let filter = MovieFilter {
        release_year: Some(2006),
        ..Default::default()
    };
    let movies = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, cars.id);

    let filter = MovieFilter {
        rating: Some(8.2),
        ..Default::default()
    };
    let movies = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(movies.len(), 1);
    assert_eq!(movies[0].id, up.id);
}

#[tokio::test]
async fn test_list_sorts() {
    let conn = init_db().await;
    let (up, cars, _, _) = seed_catalogue(&conn).await;
    let repo = MovieRepositoryImpl::new(conn);

    let sort = MovieSort {
        release_year: Some(SortDirection::Asc),
        ..Default::default()
    };
    let movies = repo.list(MovieFilter::default(), sort).await.unwrap();
    let ids: Vec<Uuid> = movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![cars.id, up.id]);

    let sort = MovieSort {
        rating: Some(SortDirection::Desc),
        ..Default::default()
    };
    let movies = repo.list(MovieFilter::default(), sort).await.unwrap();
    let ids: Vec<Uuid> = movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![up.id, cars.id]);
}

#[test]
fn test_release_year_rules() {
    use garde::Validate as _;

    assert!(new_movie("Up", 2009, None, Vec::new()).validate().is_ok());
    assert!(new_movie("Up", 1500, None, Vec::new()).validate().is_err());

    let update = UpdateMovie {
        release_year: Some(1500),
        ..Default::default()
    };
    assert!(update.validate().is_err());
    // absent fields pass trivially
    assert!(UpdateMovie::default().validate().is_ok());
}

#[tokio::test]
async fn test_list_sort_precedence() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    repo.create(new_movie("Solaris", 2002, Some(5.0), Vec::new()))
        .await
        .unwrap();
    repo.create(new_movie("Arrival", 2016, Some(5.0), Vec::new()))
        .await
        .unwrap();
    repo.create(new_movie("Dune", 2021, Some(9.0), Vec::new()))
        .await
        .unwrap();

    // rating orders first, tied ratings fall back to release year
    let sort = MovieSort {
        rating: Some(SortDirection::Desc),
        release_year: Some(SortDirection::Asc),
    };
    let movies = repo.list(MovieFilter::default(), sort).await.unwrap();
    let names: Vec<&str> = movies.iter().map(|m| m.original_name.as_str()).collect();
    assert_eq!(names, ["Dune", "Solaris", "Arrival"]);
}

#[tokio::test]
async fn test_list_pagination() {
    let conn = init_db().await;
    let repo = MovieRepositoryImpl::new(conn);

    for name in ["First", "Second", "Third"] {
        repo.create(new_movie(name, 2000, None, Vec::new()))
            .await
            .unwrap();
    }

    let all = repo
        .list(MovieFilter::default(), MovieSort::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let filter = MovieFilter {
        take: Some(1),
        skip: Some(1),
        ..Default::default()
    };
    let page = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(page.len(), 1);
    // id order is stable, so this is exactly the second record
    assert_eq!(page[0].id, all[1].id);

    let filter = MovieFilter {
        skip: Some(2),
        ..Default::default()
    };
    let rest = repo.list(filter, MovieSort::default()).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, all[2].id);
}
