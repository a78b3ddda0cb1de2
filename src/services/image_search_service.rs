use regex::Regex;
use reqwest;
use serde::Deserialize;
use std::{env, fmt, time::Duration};

use crate::models::itinerary::GeneratedItinerary;

const SEARCH_ENDPOINT: &str = "https://api.unsplash.com/search/photos";
// Unsplash demo keys allow 50 requests/hour; pace the per-attraction loop.
const REQUEST_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug)]
pub enum ImageSearchError {
    EnvironmentError(String),
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for ImageSearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSearchError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            ImageSearchError::HttpError(err) => write!(f, "HTTP error: {}", err),
            ImageSearchError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for ImageSearchError {}

impl From<reqwest::Error> for ImageSearchError {
    fn from(err: reqwest::Error) -> Self {
        ImageSearchError::HttpError(err)
    }
}

/// Unsplash photo lookup for attraction records. One landscape photo per
/// attraction, searched by name + destination with a destination-only
/// fallback. Lookup failures are logged and skipped; the itinerary itself is
/// never at risk here.
pub struct ImageSearchService {
    client: reqwest::Client,
    access_key: String,
    base_url: String,
    request_delay: Duration,
}

impl ImageSearchService {
    pub fn new() -> Result<Self, ImageSearchError> {
        let access_key = env::var("UNSPLASH_ACCESS_KEY").map_err(|_| {
            ImageSearchError::EnvironmentError("UNSPLASH_ACCESS_KEY not set".to_string())
        })?;

        Ok(Self::with_base_url(access_key, SEARCH_ENDPOINT.to_string()))
    }

    pub fn with_base_url(access_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            access_key,
            base_url,
            request_delay: REQUEST_DELAY,
        }
    }

    /// Attach a photo URL to every named attraction, mutating the itinerary
    /// in place. Sequential on purpose: one request at a time with a fixed
    /// delay keeps us under the search API's rate limit.
    pub async fn enrich_itinerary(&self, itinerary: &mut GeneratedItinerary, destination: &str) {
        for day in &mut itinerary.days {
            for attraction in &mut day.attractions {
                let Some(name) = attraction.name.clone() else {
                    continue;
                };

                match self.find_photo(&name, destination).await {
                    Ok(Some(url)) => {
                        log::info!("Found image for {}", name);
                        attraction.image_url = Some(url);
                    }
                    Ok(None) => {
                        log::info!("No image found for {}", name);
                    }
                    Err(err) => {
                        log::warn!("Error fetching image for {}: {}", name, err);
                    }
                }

                tokio::time::sleep(self.request_delay).await;
            }
        }
    }

    async fn find_photo(
        &self,
        name: &str,
        destination: &str,
    ) -> Result<Option<String>, ImageSearchError> {
        let query = sanitize_query(&format!("{} {}", name, destination));
        if let Some(url) = self.search_one(&query).await? {
            return Ok(Some(url));
        }

        // Fallback: a generic destination shot beats no image at all.
        self.search_one(&sanitize_query(destination)).await
    }

    async fn search_one(&self, query: &str) -> Result<Option<String>, ImageSearchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ImageSearchError::ResponseError(format!(
                "image search failed with status {}",
                response.status()
            )));
        }

        let data: SearchResponse = response.json().await?;
        Ok(data.results.into_iter().next().map(|photo| photo.urls.regular))
    }
}

/// Strip everything the image API chokes on; searches are plain words.
fn sanitize_query(raw: &str) -> String {
    let pattern = Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex");
    pattern.replace_all(raw, "").into_owned()
}
