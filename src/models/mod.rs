pub mod itinerary;
pub mod trip;
pub mod usage;
