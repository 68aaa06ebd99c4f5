//! # smartcode-domain
//!
//! Pure domain model for the smartcode home system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (bulbs, plugs, thermostats, curtains, weather
//!   stations and lawn mowers) with their per-kind status blocks
//! - Define **Users** and the **Shares** that grant them access to devices
//!   owned by someone else
//! - Define **Schedules** (turn-on/turn-off windows attached to a device)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod schedule;
pub mod share;
pub mod user;
