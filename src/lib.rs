//! Pill Dispenser Console
//!
//! Web console for a two-drum pill dispenser.
//!
//! This library provides:
//! - Typed client for the dispenser's HTTP API
//! - Medicine slot map with per-drum capacity rules
//! - Daily schedule validation
//! - Mode lock between manual dispensing and schedule editing
//! - Fixed-interval polling of device status, logs and schedules
//! - Server-Sent Events for real-time updates
//! - Web UI (Pico CSS)

pub mod api;
pub mod bus;
pub mod client;
pub mod config;
pub mod console;
pub mod mode_guard;
pub mod model;
pub mod poller;
pub mod routes;
pub mod ui;
