//! Builder for constructing a [`Dashboard`] instance.
//!
//! ```ignore
//! let dashboard = DashboardBuilder::http(settings)?
//!     .with_credentials(store)
//!     .build();
//! ```

use std::sync::Arc;

use anyhow::Result;

use crate::api::{AlertApi, HttpAlertApi};
use crate::auth::{CredentialStore, FileCredentialStore};
use crate::config::Settings;

use super::core::Dashboard;

/// Builder for constructing a [`Dashboard`] Facade instance
pub struct DashboardBuilder<A: AlertApi> {
    settings: Arc<Settings>,
    api: Arc<A>,
    credentials: Option<Arc<dyn CredentialStore>>,
}

impl<A: AlertApi> DashboardBuilder<A> {
    /// Create a new builder with the given settings and API client
    pub fn new(settings: Settings, api: A) -> Self {
        Self::from_shared(Arc::new(settings), Arc::new(api))
    }

    /// Create a new builder from already-shared settings and client
    pub fn from_shared(settings: Arc<Settings>, api: Arc<A>) -> Self {
        Self {
            settings,
            api,
            credentials: None,
        }
    }

    /// Use a specific credential store
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build the `Dashboard` instance
    ///
    /// If no credential store was provided, the file store at
    /// `settings.credentials_path` (or its default location) is used.
    pub fn build(self) -> Dashboard<A> {
        let credentials = self.credentials.unwrap_or_else(|| {
            Arc::new(FileCredentialStore::from_override(
                self.settings.credentials_path.as_deref(),
            ))
        });

        Dashboard::new(self.api, credentials, self.settings)
    }
}

impl DashboardBuilder<HttpAlertApi> {
    /// Builder backed by the HTTP client for `settings.api_base_url`
    pub fn http(settings: Settings) -> Result<Self> {
        let api = HttpAlertApi::new(&settings)?;
        Ok(Self::new(settings, api))
    }
}
