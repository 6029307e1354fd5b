//! Salesboard - sales analytics for a machinery dealership
//!
//! This library normalizes the dealership's sales spreadsheet, stores it in a
//! local SQLite file and computes the margin and profitability views: KPIs,
//! model profitability, seller rankings, participation and fiscal-year trends.

pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod filters;
pub mod fiscal;
pub mod importers;
pub mod margin;
pub mod reports;
pub mod utils;
