mod settings;

pub use settings::{Command, Config, RefreshSettings, Settings};
