pub mod generation_service;
pub mod image_search_service;
pub mod maps_service;
pub mod pricing_service;
pub mod quota_service;
pub mod sonar_service;
pub mod weather_service;
