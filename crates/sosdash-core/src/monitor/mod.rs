//! Alert-state synchronization: notification feed, reconciler and the
//! periodic refresh scheduler.

mod feed;
mod reconciler;
mod scheduler;

pub use feed::NotificationFeed;
pub use reconciler::Reconciler;
pub use scheduler::RefreshScheduler;
