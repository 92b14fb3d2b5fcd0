//! History aggregator: groups browsing visits into display-ready cards.
//!
//! A [`services::visit_source::VisitSource`] supplies day-bucketed visits, the
//! bucketing engine and grouping strategies shape them into cards, and a
//! [`managers::query_controller::QueryController`] keeps one view's results
//! current as its parameters and the underlying store change.

pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
