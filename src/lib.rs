pub mod api;
pub mod cli;
pub mod config;
pub mod directory;
pub mod listing;
pub mod models;
pub mod session;

pub use api::{ApiError, DirectoryClient, ErrorKind, UserApi};
pub use directory::{DeleteState, UserDirectory};
pub use listing::{compute_view, ListingView, QueryState};
pub use models::{Role, UserPayload, UserRecord};
pub use session::SessionManager;

use anyhow::Result;
use std::time::Duration;

use crate::config::Config;
use crate::session::FileStore;

/// The three collaborating pieces a front-end drives: the HTTP client, the
/// session manager and the user directory. Each is independently owned so
/// mutations to session, records and query state all go through one owner.
pub struct Console {
    pub client: DirectoryClient,
    pub session: SessionManager,
    pub directory: UserDirectory,
}

impl Console {
    /// Assemble a console from configuration, with a file-backed session
    /// store under the configured data directory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = DirectoryClient::with_timeout(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        );
        let store = FileStore::new(&config.storage.data_dir)?;
        let session = SessionManager::new(Box::new(store), config.storage.profile_ttl_hours);
        let directory = UserDirectory::new(QueryState::new(
            config.listing.page_size,
            config.listing.search_policy,
        ));

        Ok(Self {
            client,
            session,
            directory,
        })
    }
}
