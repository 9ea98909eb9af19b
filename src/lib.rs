//! bookstore-client - Storefront client for the bookstore REST API
//!
//! This crate provides the client side of the storefront with:
//! - Typed services for accounts, the book catalog and categories
//! - A persisted session and cookie jar (redb) that survive restarts
//! - Single-flight access token refresh shared by all authenticated calls
//! - Pagination windows, star ratings and form validation helpers

pub mod api;
pub mod config;
pub mod email;
pub mod forms;
pub mod pagination;
pub mod rating;
pub mod services;
pub mod session;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use api::{HttpTransport, RefreshCoordinator, Transport};
use config::{Config, ConfigError};
use services::{AuthService, BooksService, CategoriesService, CookieRefresher};
use session::{PersistentCookieJar, SessionStore};
use storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Wired-up client: one session, one refresh coordinator, and the services
/// built on them.
pub struct Storefront {
    pub auth: AuthService,
    pub books: BooksService,
    pub categories: CategoriesService,
    pub config: Config,
    pub coordinator: Arc<RefreshCoordinator>,
    pub session: Arc<SessionStore>,
}

impl Storefront {
    /// Open the session database under `config.session.data_dir` and build
    /// the client.
    pub fn open(config: Config) -> Result<Self, StorefrontError> {
        config.validate()?;
        let db = Database::open(&config.session.data_dir)?;
        info!(data_dir = %config.session.data_dir, "Session database opened");
        Self::with_database(config, db)
    }

    pub fn with_database(config: Config, db: Database) -> Result<Self, StorefrontError> {
        // The refresh cookie set at sign-in must reach the refresh call, even
        // after a restart, so every credentialed client shares one jar that
        // is saved next to the session.
        let jar = Arc::new(PersistentCookieJar::open(db.clone())?);
        let session = Arc::new(SessionStore::open(db)?);
        let public: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            build_client(&config, None)?,
            &config.api.base_url,
        ));
        let credentialed: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            build_client(&config, Some(jar))?,
            &config.api.base_url,
        ));

        let refresher = Arc::new(CookieRefresher::new(Arc::clone(&credentialed)));
        let coordinator = Arc::new(
            RefreshCoordinator::new(
                Arc::clone(&credentialed),
                refresher,
                Arc::clone(&session),
                config.session.signin_path.clone(),
            )
            .with_refresh_timeout(config.refresh_timeout()),
        );

        Ok(Self {
            auth: AuthService::new(
                Arc::clone(&public),
                credentialed,
                Arc::clone(&coordinator),
            ),
            books: BooksService::new(Arc::clone(&public)),
            categories: CategoriesService::new(public),
            config,
            coordinator,
            session,
        })
    }
}

fn build_client(
    config: &Config,
    jar: Option<Arc<PersistentCookieJar>>,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(4);
    if config.api.no_proxy {
        builder = builder.no_proxy();
    }
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    builder.build()
}
