use anyhow::{anyhow, Result};
use mvs_dal::{genre::Genre, movie::Movie};
use reqwest::Url;
use serde_json::json;

/// The create endpoints answer 201 without a body, so helpers look the new
/// record up through the list endpoints afterwards.
pub async fn create_genre(
    client: &reqwest::Client,
    base_url: &Url,
    name: &str,
    description: &str,
) -> Result<Genre> {
    let payload = json!({"name": name, "description": description});
    let api_url = base_url.join("genre/create")?;

    let response = client.post(api_url).json(&payload).send().await?;
    assert_eq!(response.status().as_u16(), 201);

    let list_url = base_url.join("genre/list")?;
    let genres: Vec<Genre> = client.get(list_url).send().await?.json().await?;
    genres
        .into_iter()
        .find(|g| g.name == name)
        .ok_or_else(|| anyhow!("Created genre {name} not found in list"))
}

pub async fn create_movie<T>(client: &reqwest::Client, base_url: &Url, payload: &T) -> Result<Movie>
where
    T: serde::Serialize,
{
    let api_url = base_url.join("movie/create")?;

    let response = client.post(api_url).json(payload).send().await?;
    assert_eq!(response.status().as_u16(), 201);

    let original_name = serde_json::to_value(payload)?
        .get("original_name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Payload has no original_name"))?;

    let list_url = base_url.join("movie/list")?;
    let movies: Vec<Movie> = client.get(list_url).send().await?.json().await?;
    movies
        .into_iter()
        .find(|m| m.original_name == original_name)
        .ok_or_else(|| anyhow!("Created movie {original_name} not found in list"))
}
