// Stateless history services: calendar math, bucketing, grouping, the visit
// source interface, and settings persistence.

pub mod bucketing;
pub mod calendar;
pub mod grouping;
pub mod settings_engine;
pub mod visit_source;
