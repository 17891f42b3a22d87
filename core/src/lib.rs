//! Cyber risk loss simulator.
//!
//! Maps a company's (industry, revenue) to attack frequency/severity
//! parameters and estimates its loss distribution by Monte Carlo.

pub mod company;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod resolver;
pub mod revenue;
pub mod rng;
pub mod simulator;
pub mod stats;
pub mod store;
pub mod types;
