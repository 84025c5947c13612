pub mod health_handlers;
pub mod weather_handlers;
