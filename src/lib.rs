// src/lib.rs
pub mod config;
pub mod errors;
pub mod providers;
pub mod grader;
pub mod annotator;
pub mod models;
pub mod banner;
pub mod api;
