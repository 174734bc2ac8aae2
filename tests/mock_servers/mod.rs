//! Mock servers for integration testing
//!
//! Simulates the dispenser's HTTP API so the console can be tested without
//! real hardware.

#![allow(dead_code)]

pub mod dispenser;

pub use dispenser::MockDispenser;
