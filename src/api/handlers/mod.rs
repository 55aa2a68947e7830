// src/api/handlers/mod.rs
mod health;
mod grade;

pub use health::health_check;
pub use grade::grade_papers;
