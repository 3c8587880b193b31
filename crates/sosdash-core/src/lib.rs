//! Core library for sosdash.
//!
//! Keeps a local view of which monitored connections currently have an
//! active SOS alert, reconciling three asynchronous sources:
//!
//! - the full-state poll (`GET /sos/active`), which replaces the view,
//! - the notification feed (`GET /notifications`), which can only add,
//! - the user's own toggle (`POST /sos`), which drives [`sos::SelfAlertStateMachine`].
//!
//! Consumers go through [`dashboard::Dashboard`] and the per-activation
//! [`dashboard::DashboardSession`] instead of wiring the pieces themselves.

pub mod api;
pub mod auth;
pub mod config;
pub mod connections;
pub mod dashboard;
pub mod monitor;
pub mod sos;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
