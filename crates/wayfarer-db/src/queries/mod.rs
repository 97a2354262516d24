//! Query functions, one module per table.

pub mod activities;
pub mod itineraries;
