//! # petfence-server
//!
//! HTTP server library for the pet collar geofence monitor.
//!
//! This library provides the API handlers, shared state, process settings,
//! and serving helpers used by the `petfence-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod serve;
pub mod settings;
pub mod state;
