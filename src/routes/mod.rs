pub mod generate;
pub mod health;
pub mod itinerary;
pub mod trip;
