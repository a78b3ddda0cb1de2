use actix_web::{web, HttpResponse, Responder};
use bson::doc;
use futures::TryStreamExt;
use mongodb::{bson::oid::ObjectId, Client};
use std::sync::Arc;

use crate::db::mongo;
use crate::middleware::auth::Claims;
use crate::models::itinerary::DailyItinerary;

/*
    GET /api/trips/{id}/itinerary

    The trip's persisted day rows, ordered by day number.
*/
pub async fn get_for_trip(
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

    // Ownership check before exposing day rows.
    match mongo::trips(&client)
        .find_one(doc! { "_id": trip_id, "user_id": user_id })
        .await
    {
        Ok(Some(_)) => {}
        Ok(None) => return HttpResponse::NotFound().body("Trip not found"),
        Err(err) => {
            log::error!("Failed to retrieve trip: {:?}", err);
            return HttpResponse::InternalServerError().body("Failed to retrieve itinerary");
        }
    }

    let cursor = mongo::itineraries(&client)
        .find(doc! { "trip_id": trip_id })
        .sort(doc! { "day_number": 1 })
        .await;

    match cursor {
        Ok(cursor) => match cursor.try_collect::<Vec<DailyItinerary>>().await {
            Ok(days) => HttpResponse::Ok().json(days),
            Err(err) => {
                log::error!("Failed to collect itinerary days: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve itinerary")
            }
        },
        Err(err) => {
            log::error!("Failed to retrieve itinerary: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to retrieve itinerary")
        }
    }
}
