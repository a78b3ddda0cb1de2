use actix_cors::Cors;
use actix_web::{web, App, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DAILY_REQUEST_LIMIT: i32 = 5;

#[derive(Clone)]
struct GenerateState {
    usage: Arc<Mutex<HashMap<String, i32>>>,
    completion_calls: Arc<AtomicUsize>,
}

/// In-process stand-in for the API surface. Handlers mimic the documented
/// contract (auth rejections, quota accounting, distinct error codes)
/// without any database or upstream dependency, the same way the protected
/// routes are mocked for route-shape tests.
pub struct TestApp {
    usage: Arc<Mutex<HashMap<String, i32>>>,
    completion_calls: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            usage: Arc::new(Mutex::new(HashMap::new())),
            completion_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Completion-endpoint invocations observed by the mock generate
    /// handler. Quota rejections must never reach it.
    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<
                actix_web::body::EitherBody<actix_web::body::BoxBody>,
            >,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let state = GenerateState {
            usage: self.usage.clone(),
            completion_calls: self.completion_calls.clone(),
        };

        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/trips")
                            .service(
                                web::resource("")
                                    .route(web::post().to(unauthorized_handler))
                                    .route(web::get().to(unauthorized_handler)),
                            )
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(unauthorized_handler)),
                            )
                            .service(
                                web::resource("/{id}/itinerary")
                                    .route(web::get().to(unauthorized_handler)),
                            ),
                    )
                    .service(
                        web::scope("/itineraries")
                            .app_data(web::Data::new(state))
                            .service(
                                web::resource("/generate")
                                    .route(web::post().to(mock_generate)),
                            ),
                    ),
            )
    }
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn unauthorized_handler() -> impl Responder {
    HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }))
}

/// Mirrors the generation endpoint's contract: bearer identity required,
/// five requests per identity per day, quota rejections carry their own
/// code and never touch the completion counter.
async fn mock_generate(
    req: HttpRequest,
    state: web::Data<GenerateState>,
    input: web::Json<serde_json::Value>,
) -> impl Responder {
    let identity = match bearer_identity(&req) {
        Some(identity) => identity,
        None => {
            return HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" }));
        }
    };

    let usage = {
        let mut usage = state.usage.lock().unwrap();
        let count = usage.entry(identity).or_insert(0);
        if *count >= DAILY_REQUEST_LIMIT {
            return HttpResponse::TooManyRequests().json(json!({
                "error": format!("Daily API limit reached ({} requests per day)", DAILY_REQUEST_LIMIT),
                "code": "quota_exceeded",
            }));
        }
        *count += 1;
        *count
    };

    state.completion_calls.fetch_add(1, Ordering::SeqCst);

    // Quota is consumed before the upstream call, so a failing pipeline
    // still spends its unit.
    if input
        .get("simulate_upstream_failure")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
    {
        return HttpResponse::ServiceUnavailable().json(json!({
            "error": "AI service temporarily unavailable",
            "code": "upstream_unavailable",
        }));
    }

    HttpResponse::Ok().json(json!({
        "success": true,
        "itinerary": { "days": [], "travel_tips": [] },
        "usage": usage,
    }))
}

fn bearer_identity(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

pub fn get_test_token() -> String {
    "test_user_123".to_string()
}
