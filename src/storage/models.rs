use serde::{Deserialize, Serialize};

/// The signed-in account profile, as returned by signin and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Birth date, `YYYY-MM-DD`
    pub birthday: String,
    pub email: String,
    pub full_name: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_google_user: Option<bool>,
    pub phone: String,
}

/// The persisted subset of a session.
///
/// Only these fields are ever written to disk; anything else the runtime
/// session grows stays in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub access_token: Option<String>,
    pub account: Option<Account>,
    pub is_authenticated: bool,
}

/// A `Set-Cookie` header as received, kept so the jar can be rebuilt after a
/// restart. At most one entry per cookie name and host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub host: String,
    pub name: String,
    pub set_cookie: String,
    /// URL of the response that set the cookie
    pub url: String,
}
