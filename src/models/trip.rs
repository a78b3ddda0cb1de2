use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Travel-style tag chosen on the trip form. Influences the tone of the
/// generated itinerary, nothing else.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TripVibe {
    Relax,
    Adventure,
    Culture,
    Foodie,
    Luxury,
}

impl TripVibe {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripVibe::Relax => "Relax",
            TripVibe::Adventure => "Adventure",
            TripVibe::Culture => "Culture",
            TripVibe::Foodie => "Foodie",
            TripVibe::Luxury => "Luxury",
        }
    }
}

/// Lifecycle flag. Only the generation flow moves a trip to `Generated`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Draft,
    Generated,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Trip {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub budget: f64,
    pub trip_vibe: TripVibe,
    pub hotel_name: Option<String>,
    pub hotel_address: Option<String>,
    pub number_of_people: u32,
    pub status: TripStatus,
    // We always want these fields, but have them optional so we can set them in the code
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Trip-form submission payload. Status and timestamps are set server-side.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateTripRequest {
    pub title: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub budget: f64,
    pub trip_vibe: TripVibe,
    pub hotel_name: Option<String>,
    pub hotel_address: Option<String>,
    pub number_of_people: u32,
}

/// Everything the generation pipeline needs for one trip.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerateItineraryRequest {
    pub trip_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub arrival_time: Option<String>,
    pub departure_time: Option<String>,
    pub budget: f64,
    pub trip_vibe: TripVibe,
    pub hotel_name: Option<String>,
    pub hotel_address: Option<String>,
    pub number_of_people: u32,
}
