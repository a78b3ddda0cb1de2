use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use mongodb::{bson::oid::ObjectId, Client};
use serde_json::json;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::trip::GenerateItineraryRequest;
use crate::services::generation_service::{GenerationError, ItineraryGenerator};

/*
    POST /api/itineraries/generate

    The one orchestration endpoint. Every failure mode maps to its own
    status/code pair so the caller can render a specific message.
*/
pub async fn generate(
    claims: web::ReqData<Claims>,
    data: web::Data<Arc<Client>>,
    input: web::Json<GenerateItineraryRequest>,
) -> impl Responder {
    let client = data.get_ref().clone();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Invalid user ID", "code": "internal" }))
        }
    };
    let trip_id = match ObjectId::parse_str(&input.trip_id) {
        Ok(id) => id,
        Err(_) => {
            return HttpResponse::BadRequest()
                .json(json!({ "error": "Invalid trip ID", "code": "internal" }))
        }
    };

    let generator = match ItineraryGenerator::new(client) {
        Ok(generator) => generator,
        Err(err) => return error_response(&err),
    };

    match generator.generate(user_id, trip_id, &input).await {
        Ok(outcome) => HttpResponse::Ok().json(json!({
            "success": true,
            "itinerary": outcome.itinerary,
            "usage": outcome.usage,
        })),
        Err(err) => {
            log::error!("Itinerary generation failed: {}", err);
            error_response(&err)
        }
    }
}

fn error_response(err: &GenerationError) -> HttpResponse {
    let (status, code) = match err {
        GenerationError::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
        GenerationError::UpstreamUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable")
        }
        GenerationError::ResponseParse(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "response_parse")
        }
        GenerationError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
        GenerationError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    HttpResponse::build(status).json(json!({ "error": err.to_string(), "code": code }))
}
