//! Budget-constrained activity generation and the rules that keep an
//! itinerary's activity set consistent.
//!
//! Leaves first: [`catalog`] holds the activity templates, [`budget`] turns a
//! trip budget into a daily budget and a template pool, [`planner`] draws a
//! day-by-day schedule from that pool, and [`itinerary`] persists and edits
//! the result under its owning itinerary.

pub mod budget;
pub mod catalog;
pub mod decode;
pub mod error;
pub mod itinerary;
pub mod planner;
pub mod token;

pub use error::{CoreError, CoreResult};
pub use planner::{ActivityDraft, Planner, generate, generate_seeded};
