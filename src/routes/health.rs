use actix_web::{web, HttpResponse, Responder};
use mongodb::{bson::doc, Client};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::db::mongo::DB_NAME;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

pub async fn health_check(client: web::Data<Arc<Client>>) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: env::var("RUST_ENV").unwrap_or("development".to_string()),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let mongo_result = check_mongodb(&client).await;
    health
        .services
        .insert("mongodb".to_string(), mongo_result.clone());

    // The completion credential is the only one the pipeline cannot run
    // without; the rest merely disable their enricher.
    health
        .services
        .insert("sonar".to_string(), check_key("SONAR_API_KEY"));
    health
        .services
        .insert("weather".to_string(), check_key("OPENWEATHER_API_KEY"));
    health
        .services
        .insert("maps".to_string(), check_key("GOOGLE_MAPS_API_KEY"));
    health
        .services
        .insert("images".to_string(), check_key("UNSPLASH_ACCESS_KEY"));

    if mongo_result.status != "ok" || health.services["sonar"].status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(client: &Arc<Client>) -> ServiceStatus {
    match client
        .database(DB_NAME)
        .run_command(doc! { "ping": 1 })
        .await
    {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: None,
        },
        Err(err) => ServiceStatus {
            status: "error".to_string(),
            details: Some(err.to_string()),
        },
    }
}

fn check_key(var: &str) -> ServiceStatus {
    match env::var(var) {
        Ok(value) if !value.is_empty() => ServiceStatus {
            status: "ok".to_string(),
            details: None,
        },
        _ => ServiceStatus {
            status: "missing".to_string(),
            details: Some(format!("{} not set", var)),
        },
    }
}
