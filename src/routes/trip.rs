use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::{bson::doc, Client};
use serde_json::json;
use std::sync::Arc;

use crate::db::mongo;
use crate::middleware::auth::Claims;
use crate::models::trip::{CreateTripRequest, Trip, TripStatus};
use crate::services::pricing_service::PricingService;

/*
    POST /api/trips
*/
pub async fn create_trip(
    claims: web::ReqData<Claims>,
    data: web::Data<Arc<Client>>,
    input: web::Json<CreateTripRequest>,
) -> impl Responder {
    let client = data.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    let form = input.into_inner();
    if form.end_date < form.start_date {
        return HttpResponse::BadRequest().body("End date must not precede start date");
    }
    if form.number_of_people == 0 {
        return HttpResponse::BadRequest().body("Party size must be at least 1");
    }

    let now = Utc::now();
    let mut trip = Trip {
        id: None,
        user_id,
        title: form.title,
        destination: form.destination,
        start_date: form.start_date,
        end_date: form.end_date,
        arrival_time: form.arrival_time,
        departure_time: form.departure_time,
        budget: form.budget,
        trip_vibe: form.trip_vibe,
        hotel_name: form.hotel_name,
        hotel_address: form.hotel_address,
        number_of_people: form.number_of_people,
        status: TripStatus::Draft,
        created_at: Some(now),
        updated_at: Some(now),
    };

    match mongo::trips(&client).insert_one(&trip).await {
        Ok(result) => {
            trip.id = result.inserted_id.as_object_id();
            HttpResponse::Ok().json(trip)
        }
        Err(err) => {
            log::error!("Failed to create trip: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create trip")
        }
    }
}

/*
    GET /api/trips
*/
pub async fn get_trips(
    claims: web::ReqData<Claims>,
    data: web::Data<Arc<Client>>,
) -> impl Responder {
    let client = data.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    let cursor = mongo::trips(&client)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await;

    match cursor {
        Ok(cursor) => match cursor.try_collect::<Vec<Trip>>().await {
            Ok(trips) => HttpResponse::Ok().json(trips),
            Err(err) => {
                log::error!("Failed to collect trips: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve trips")
            }
        },
        Err(err) => {
            log::error!("Failed to retrieve trips: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to retrieve trips")
        }
    }
}

/*
    GET /api/trips/{id}

    Trip details plus the cost rollup over its persisted day rows.
*/
pub async fn get_by_id(
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    data: web::Data<Arc<Client>>,
) -> impl Responder {
    let client = data.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };
    let trip_id: ObjectId = match ObjectId::parse_str(path.into_inner().as_str()) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid ID"),
    };

    let trip = match mongo::trips(&client)
        .find_one(doc! { "_id": trip_id, "user_id": user_id })
        .await
    {
        Ok(Some(trip)) => trip,
        Ok(None) => return HttpResponse::NotFound().body("Trip not found"),
        Err(err) => {
            log::error!("Failed to retrieve trip: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to retrieve trip");
        }
    };

    let days = match mongo::itineraries(&client)
        .find(doc! { "trip_id": trip_id })
        .sort(doc! { "day_number": 1 })
        .await
    {
        Ok(cursor) => match cursor.try_collect::<Vec<_>>().await {
            Ok(days) => days,
            Err(err) => {
                log::error!("Failed to collect itinerary days: {:?}", err);
                return HttpResponse::InternalServerError().body("Failed to retrieve trip");
            }
        },
        Err(err) => {
            log::error!("Failed to retrieve itinerary days: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to retrieve trip");
        }
    };

    let group_cost = PricingService::trip_group_cost(&days, trip.number_of_people);
    let person_cost = PricingService::trip_person_cost(&days, trip.number_of_people);

    HttpResponse::Ok().json(json!({
        "trip": trip,
        "total_cost_for_group": group_cost,
        "total_cost_per_person": person_cost,
    }))
}
