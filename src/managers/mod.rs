// Stateful components: the visit store, its async source adapter, and the
// per-view query controller.

pub mod query_controller;
pub mod sqlite_source;
pub mod visit_store;
