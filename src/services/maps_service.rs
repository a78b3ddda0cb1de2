use reqwest;
use serde::Deserialize;
use std::{env, fmt, time::Duration};

const MAPS_API_BASE: &str = "https://maps.googleapis.com/maps/api";
const POI_RADIUS_METERS: u32 = 5000;
const MAX_NEARBY_ATTRACTIONS: usize = 5;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    name: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

#[derive(Debug)]
pub enum MapsError {
    EnvironmentError(String),
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for MapsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapsError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            MapsError::HttpError(err) => write!(f, "HTTP error: {}", err),
            MapsError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for MapsError {}

impl From<reqwest::Error> for MapsError {
    fn from(err: reqwest::Error) -> Self {
        MapsError::HttpError(err)
    }
}

/// Google Maps client covering the geocode / places-nearby / distance-matrix
/// trio. Used only to build the hotel travel-time context string; failures
/// never abort the generation flow.
pub struct MapsService {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MapsService {
    pub fn new() -> Result<Self, MapsError> {
        let api_key = env::var("GOOGLE_MAPS_API_KEY").map_err(|_| {
            MapsError::EnvironmentError("GOOGLE_MAPS_API_KEY not set".to_string())
        })?;

        Ok(Self::with_base_url(api_key, MAPS_API_BASE.to_string()))
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Driving time and distance from the lodging address to the top
    /// tourist attractions around the destination, as one summary string:
    /// `Travel times from hotel: Fort Aguada: 15 mins (2.5 km), ...`
    pub async fn travel_context(
        &self,
        destination: &str,
        hotel_address: &str,
    ) -> Result<String, MapsError> {
        let center = self.geocode(destination).await?;
        let attractions = self.nearby_attractions(center).await?;
        if attractions.is_empty() {
            return Err(MapsError::ResponseError(format!(
                "no tourist attractions found near {}",
                destination
            )));
        }

        let legs = self.distances_from(hotel_address, &attractions).await?;
        Ok(format!("Travel times from hotel: {}", legs.join(", ")))
    }

    async fn geocode(&self, address: &str) -> Result<LatLng, MapsError> {
        let url = format!("{}/geocode/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let data: GeocodeResponse = response.json().await?;
        data.results
            .first()
            .map(|result| result.geometry.location)
            .ok_or_else(|| {
                MapsError::ResponseError(format!("no geocode result for {}", address))
            })
    }

    async fn nearby_attractions(&self, center: LatLng) -> Result<Vec<Place>, MapsError> {
        let url = format!("{}/place/nearbysearch/json", self.base_url);
        let location = format!("{},{}", center.lat, center.lng);
        let radius = POI_RADIUS_METERS.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", "tourist_attraction"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let data: PlacesResponse = response.json().await?;
        Ok(data
            .results
            .into_iter()
            .take(MAX_NEARBY_ATTRACTIONS)
            .collect())
    }

    /// One batched distance-matrix call from the hotel address to every
    /// attraction coordinate.
    async fn distances_from(
        &self,
        origin: &str,
        places: &[Place],
    ) -> Result<Vec<String>, MapsError> {
        let destinations = places
            .iter()
            .map(|place| {
                format!(
                    "{},{}",
                    place.geometry.location.lat, place.geometry.location.lng
                )
            })
            .collect::<Vec<_>>()
            .join("|");

        let url = format!("{}/distancematrix/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("origins", origin),
                ("destinations", destinations.as_str()),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let data: DistanceMatrixResponse = response.json().await?;
        if data.status != "OK" {
            return Err(MapsError::ResponseError(format!(
                "distance matrix error: {}",
                data.status
            )));
        }

        let row = data.rows.into_iter().next().ok_or_else(|| {
            MapsError::ResponseError("distance matrix returned no rows".to_string())
        })?;

        Ok(row
            .elements
            .iter()
            .zip(places)
            .map(|(element, place)| {
                let duration = element
                    .duration
                    .as_ref()
                    .map(|d| d.text.as_str())
                    .unwrap_or("Unknown");
                let distance = element
                    .distance
                    .as_ref()
                    .map(|d| d.text.as_str())
                    .unwrap_or("Unknown");
                format!("{}: {} ({})", place.name, duration, distance)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn mock_geocode(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("GET", "/geocode/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "status": "OK",
                    "results": [
                        { "geometry": { "location": { "lat": 15.2993, "lng": 74.124 } } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn builds_travel_context_from_the_three_calls() {
        let mut server = mockito::Server::new_async().await;
        let geocode = mock_geocode(&mut server).await;
        let places = server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "status": "OK",
                    "results": [
                        { "name": "Fort Aguada", "geometry": { "location": { "lat": 15.4925, "lng": 73.7735 } } },
                        { "name": "Basilica of Bom Jesus", "geometry": { "location": { "lat": 15.5009, "lng": 73.9116 } } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let matrix = server
            .mock("GET", "/distancematrix/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "status": "OK",
                    "rows": [
                        {
                            "elements": [
                                { "status": "OK", "distance": { "text": "2.5 km" }, "duration": { "text": "15 mins" } },
                                { "status": "OK", "distance": { "text": "8 km" }, "duration": { "text": "25 mins" } }
                            ]
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let service = MapsService::with_base_url("test-key".to_string(), server.url());
        let context = service
            .travel_context("Goa", "Taj Holiday Village, Candolim")
            .await
            .unwrap();

        geocode.assert_async().await;
        places.assert_async().await;
        matrix.assert_async().await;
        assert_eq!(
            context,
            "Travel times from hotel: Fort Aguada: 15 mins (2.5 km), Basilica of Bom Jesus: 25 mins (8 km)"
        );
    }

    #[tokio::test]
    async fn empty_poi_list_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        mock_geocode(&mut server).await;
        server
            .mock("GET", "/place/nearbysearch/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({ "status": "ZERO_RESULTS", "results": [] }).to_string())
            .create_async()
            .await;

        let service = MapsService::with_base_url("test-key".to_string(), server.url());
        assert!(service
            .travel_context("Nowhere", "Some Hotel")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn missing_geocode_result_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/geocode/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(json!({ "status": "ZERO_RESULTS", "results": [] }).to_string())
            .create_async()
            .await;

        let service = MapsService::with_base_url("test-key".to_string(), server.url());
        assert!(service.travel_context("Goa", "Some Hotel").await.is_err());
    }
}
