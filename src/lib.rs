//! Screen time mental health survey API: questionnaire scoring, risk
//! classification, recommendations, and weekly summaries over SQLite.

pub mod auth;
pub mod config;
pub mod db;
pub mod handlers;
pub mod http;
pub mod models;
pub mod predict;
pub mod recommend;
pub mod weekly;
