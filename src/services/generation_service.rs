use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::{bson::doc, Client};
use std::sync::Arc;
use std::{error, fmt};

use crate::db::mongo;
use crate::models::itinerary::{DailyItinerary, GeneratedItinerary};
use crate::models::trip::GenerateItineraryRequest;
use crate::services::image_search_service::ImageSearchService;
use crate::services::maps_service::MapsService;
use crate::services::quota_service::{QuotaDecision, QuotaService, DAILY_REQUEST_LIMIT};
use crate::services::sonar_service::{self, SonarError, SonarService};
use crate::services::weather_service::WeatherService;

/// Everything that can fatally end a generation request. Enrichment
/// failures (weather, travel times, images) never show up here; they
/// degrade to empty context inside the pipeline.
#[derive(Debug)]
pub enum GenerationError {
    QuotaExceeded,
    UpstreamUnavailable(String),
    ResponseParse(String),
    Persistence(mongodb::error::Error),
    Internal(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::QuotaExceeded => write!(
                f,
                "Daily API limit reached ({} requests per day)",
                DAILY_REQUEST_LIMIT
            ),
            GenerationError::UpstreamUnavailable(msg) => {
                write!(f, "AI service temporarily unavailable: {}", msg)
            }
            GenerationError::ResponseParse(msg) => {
                write!(f, "Failed to parse AI response: {}", msg)
            }
            GenerationError::Persistence(err) => write!(f, "Failed to save itinerary: {}", err),
            GenerationError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl error::Error for GenerationError {}

impl From<SonarError> for GenerationError {
    fn from(err: SonarError) -> Self {
        match err {
            SonarError::EnvironmentError(msg) => GenerationError::Internal(msg),
            SonarError::Unavailable(msg) => GenerationError::UpstreamUnavailable(msg),
            SonarError::ParseError(msg) => GenerationError::ResponseParse(msg),
        }
    }
}

pub struct GenerationOutcome {
    pub itinerary: GeneratedItinerary,
    /// Usage counter value after this request's increment.
    pub usage: i32,
}

/// Orchestrates one itinerary generation end to end: quota, the two prompt
/// enrichers, synthesis, image enrichment, persistence, status flip. All
/// external calls are sequential; nothing is retried.
pub struct ItineraryGenerator {
    client: Arc<Client>,
    quota: QuotaService,
    sonar: SonarService,
    weather: Option<WeatherService>,
    maps: Option<MapsService>,
    images: Option<ImageSearchService>,
}

impl ItineraryGenerator {
    /// The completion credential is the only mandatory one; each enricher is
    /// switched off individually when its credential is missing.
    pub fn new(client: Arc<Client>) -> Result<Self, GenerationError> {
        let sonar =
            SonarService::new().map_err(|err| GenerationError::Internal(err.to_string()))?;

        let weather = match WeatherService::new() {
            Ok(service) => Some(service),
            Err(err) => {
                log::warn!("Weather enrichment disabled: {}", err);
                None
            }
        };

        let maps = match MapsService::new() {
            Ok(service) => Some(service),
            Err(err) => {
                log::warn!("Travel-time enrichment disabled: {}", err);
                None
            }
        };

        let images = match ImageSearchService::new() {
            Ok(service) => Some(service),
            Err(err) => {
                log::warn!("Image enrichment disabled: {}", err);
                None
            }
        };

        Ok(Self {
            quota: QuotaService::new(client.clone()),
            client,
            sonar,
            weather,
            maps,
            images,
        })
    }

    pub async fn generate(
        &self,
        user_id: ObjectId,
        trip_id: ObjectId,
        request: &GenerateItineraryRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        // Quota is consumed up front; a request that fails later in the
        // pipeline has still spent its unit.
        let usage = match self
            .quota
            .consume(user_id)
            .await
            .map_err(|err| GenerationError::Internal(err.to_string()))?
        {
            QuotaDecision::Allowed(count) => count,
            QuotaDecision::LimitReached => return Err(GenerationError::QuotaExceeded),
        };

        log::info!(
            "Processing itinerary request for user {} (usage {}/{})",
            user_id,
            usage,
            DAILY_REQUEST_LIMIT
        );

        let weather_context = match &self.weather {
            Some(weather) => weather
                .forecast_summary(&request.destination)
                .await
                .unwrap_or_else(|err| {
                    log::warn!("Weather API error: {}", err);
                    String::new()
                }),
            None => String::new(),
        };

        let travel_context = match (&self.maps, request.hotel_address.as_deref()) {
            (Some(maps), Some(address)) if !address.is_empty() => maps
                .travel_context(&request.destination, address)
                .await
                .unwrap_or_else(|err| {
                    log::warn!("Google Maps API error: {}", err);
                    String::new()
                }),
            _ => String::new(),
        };

        let prompt = sonar_service::build_prompt(request, &weather_context, &travel_context);
        log::info!("Calling Sonar AI for trip {}", trip_id);
        let payload = self.sonar.synthesize(&prompt).await?;
        let mut itinerary = GeneratedItinerary::from_value(payload);

        if let Some(images) = &self.images {
            images
                .enrich_itinerary(&mut itinerary, &request.destination)
                .await;
        } else {
            log::info!("Unsplash access key not configured, skipping image fetching");
        }

        self.persist(trip_id, &itinerary)
            .await
            .map_err(GenerationError::Persistence)?;

        log::info!("Itinerary generation completed for trip {}", trip_id);
        Ok(GenerationOutcome { itinerary, usage })
    }

    /// Replace the trip's day rows and flip its status. The three writes run
    /// in one transaction so a crash can never leave a trip with half its
    /// days.
    async fn persist(
        &self,
        trip_id: ObjectId,
        itinerary: &GeneratedItinerary,
    ) -> Result<(), mongodb::error::Error> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let days = mongo::itineraries(&self.client);
        days.delete_many(doc! { "trip_id": trip_id })
            .session(&mut session)
            .await?;

        let rows = Self::build_day_rows(trip_id, itinerary);
        if !rows.is_empty() {
            days.insert_many(&rows).session(&mut session).await?;
        }

        mongo::trips(&self.client)
            .update_one(
                doc! { "_id": trip_id },
                doc! { "$set": {
                    "status": "generated",
                    "updated_at": Utc::now().to_rfc3339(),
                } },
            )
            .session(&mut session)
            .await?;

        session.commit_transaction().await
    }

    /// Day numbers are positional over the synthesized list, so the stored
    /// set is always a contiguous 1..=n range whatever the model put in its
    /// own `day` fields.
    fn build_day_rows(trip_id: ObjectId, itinerary: &GeneratedItinerary) -> Vec<DailyItinerary> {
        let now = Utc::now();
        itinerary
            .days
            .iter()
            .enumerate()
            .map(|(index, day)| DailyItinerary {
                id: None,
                trip_id,
                day_number: index as u32 + 1,
                activities: day.activities.clone(),
                attractions: day.attractions.clone(),
                food_recommendations: day.food_recommendations.clone(),
                weather_info: itinerary.weather_forecast.clone(),
                created_at: Some(now),
            })
            .collect()
    }
}
