//! Dashboard facade: activation, sessions and the event stream.

mod builder;
mod core;
pub mod events;
mod session;

pub use builder::DashboardBuilder;
pub use self::core::Dashboard;
pub use events::{DashboardEvent, RefreshSource};
pub use session::DashboardSession;
