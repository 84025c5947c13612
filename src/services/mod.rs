pub mod blob_store;
pub mod cloud_store;
pub mod filename;
pub mod local_store;
pub mod open_meteo;
pub mod validation;
pub mod weather_service;
