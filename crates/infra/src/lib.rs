//! Infrastructure layer: event store, dispatch, projections, realtime feed
//! and the low-stock workflow runtime.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod realtime;
pub mod workers;
pub mod workflows;

#[cfg(test)]
mod integration_tests;
