use anyhow::Result;
use filmes_dal::movie::Movie;
use reqwest::Url;
use serde_json::json;
use tracing::info;

pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    title: &str,
    genre: &str,
    duration_minutes: i64,
) -> Result<Movie> {
    let payload = json!({"title": title, "genre": genre, "duration_minutes": duration_minutes});
    let api_url = base_url.join("filme").unwrap();

    let response = client.post(api_url.clone()).json(&payload).send().await?;
    info!("Response: {:#?}", response);
    assert!(response.status().is_success());
    assert!(response.status().as_u16() == 201);

    let new_movie: Movie = response.json().await?;

    Ok(new_movie)
}
