use std::sync::{Mutex, PoisonError};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use tracing::{debug, warn};

use crate::storage::models::StoredCookie;
use crate::storage::{Database, DatabaseError};

/// Cookie jar that survives restarts.
///
/// Lookups go to an in-memory [`Jar`]. Every `Set-Cookie` header is also
/// written to the database, and [`PersistentCookieJar::open`] replays them in
/// arrival order, so the refresh cookie set at sign-in is still sent after
/// the process comes back. Expiry and removal follow whatever the replayed
/// headers say.
pub struct PersistentCookieJar {
    db: Database,
    jar: Jar,
    saved: Mutex<Vec<StoredCookie>>,
}

impl PersistentCookieJar {
    pub fn open(db: Database) -> Result<Self, DatabaseError> {
        let saved = db.load_cookies()?;
        let jar = Jar::default();
        for cookie in &saved {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.set_cookie, &url),
                Err(e) => warn!(url = %cookie.url, error = %e, "Skipping stored cookie"),
            }
        }
        debug!(count = saved.len(), "Restored cookies");
        Ok(Self {
            db,
            jar,
            saved: Mutex::new(saved),
        })
    }

    fn remember(&self, headers: &[HeaderValue], url: &Url) {
        let host = url.host_str().unwrap_or_default();
        let snapshot = {
            let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
            for header in headers {
                let Ok(set_cookie) = header.to_str() else {
                    continue;
                };
                let Some(name) = cookie_name(set_cookie) else {
                    continue;
                };
                saved.retain(|c| !(c.host == host && c.name == name));
                saved.push(StoredCookie {
                    host: host.to_string(),
                    name: name.to_string(),
                    set_cookie: set_cookie.to_string(),
                    url: url.to_string(),
                });
            }
            saved.clone()
        };

        // Same policy as the session: keep going in memory if the write fails
        if let Err(e) = self.db.save_cookies(&snapshot) {
            warn!(error = %e, "Failed to persist cookies");
        }
    }
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
    let (name, _) = set_cookie.split(';').next()?.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<HeaderValue> = cookie_headers.cloned().collect();
        if headers.is_empty() {
            return;
        }
        self.jar.set_cookies(&mut headers.iter(), url);
        self.remember(&headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

impl std::fmt::Debug for PersistentCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCookieJar").finish_non_exhaustive()
    }
}
