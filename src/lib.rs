pub mod affiliates;
pub mod analytics;
pub mod app;
pub mod debug;
pub mod error;
pub mod games;
pub mod models;
pub mod offers;
pub mod omdb;
pub mod region;
pub mod search;
pub mod streaming;
pub mod title;
pub mod tmdb;
