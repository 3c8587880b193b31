mod store;

pub use store::{ActiveAlertSet, AlertView};
pub(crate) use store::SharedAlertSet;
