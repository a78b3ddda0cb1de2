use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// The upstream model's output shape is not contractually guaranteed, so every
// field on these records is optional and unknown fields are tolerated.

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ActivityEntry {
    pub time: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub cost_estimate: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AttractionEntry {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visit_time: Option<String>,
    pub entrance_fee: Option<f64>,
    pub distance_from_hotel: Option<String>,
    pub travel_time_from_hotel: Option<String>,
    pub recommended_duration: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FoodEntry {
    pub name: Option<String>,
    pub cuisine: Option<String>,
    pub price_range: Option<String>,
    pub cost_per_person: Option<f64>,
    pub total_cost_for_group: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ItineraryDay {
    pub day: Option<u32>,
    pub date: Option<String>,
    #[serde(default)]
    pub activities: Vec<ActivityEntry>,
    #[serde(default)]
    pub attractions: Vec<AttractionEntry>,
    #[serde(default)]
    pub food_recommendations: Vec<FoodEntry>,
    pub estimated_day_cost: Option<f64>,
    pub estimated_day_cost_for_group: Option<f64>,
}

/// The synthesized itinerary as returned to the caller and fed to the
/// image enricher and persistence steps.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GeneratedItinerary {
    #[serde(default)]
    pub days: Vec<ItineraryDay>,
    pub travel_tips: Option<Vec<String>>,
    pub total_cost_per_person: Option<f64>,
    pub cost_breakdown: Option<Value>,
    pub weather_forecast: Option<Value>,
}

impl GeneratedItinerary {
    /// Lenient extraction from a freshly parsed completion payload.
    ///
    /// Malformed day entries are skipped with a warning instead of failing
    /// the whole itinerary; validation happens here, at the boundary, so
    /// downstream code only ever sees well-formed records.
    pub fn from_value(value: Value) -> Self {
        let mut itinerary = GeneratedItinerary {
            travel_tips: value
                .get("travel_tips")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            total_cost_per_person: value.get("total_cost_per_person").and_then(Value::as_f64),
            cost_breakdown: value.get("cost_breakdown").cloned(),
            weather_forecast: value.get("weather_forecast").cloned(),
            ..Default::default()
        };

        let Some(days) = value.get("days").and_then(Value::as_array) else {
            log::warn!("Completion payload has no days array");
            return itinerary;
        };

        for (index, day) in days.iter().enumerate() {
            match serde_json::from_value::<ItineraryDay>(day.clone()) {
                Ok(parsed) => itinerary.days.push(parsed),
                Err(err) => {
                    log::warn!("Skipping malformed day entry {}: {}", index + 1, err);
                }
            }
        }

        itinerary
    }
}

/// One persisted day of a trip's itinerary. Day numbers for a trip always
/// form a contiguous range starting at 1.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DailyItinerary {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub trip_id: ObjectId,
    pub day_number: u32,
    pub activities: Vec<ActivityEntry>,
    pub attractions: Vec<AttractionEntry>,
    pub food_recommendations: Vec<FoodEntry>,
    pub weather_info: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
}
