//! Webmail lookup for the "check your inbox" step after signup and
//! password retrieval.

pub const DEFAULT_WEBMAIL: &str = "https://mail.google.com";

const PROVIDERS: &[(&str, &str)] = &[
    ("gmail.com", "https://mail.google.com"),
    ("yahoo.com", "https://mail.yahoo.com"),
    ("outlook.com", "https://outlook.live.com"),
    ("hotmail.com", "https://outlook.live.com"),
    ("live.com", "https://outlook.live.com"),
    ("msn.com", "https://outlook.live.com"),
    ("icloud.com", "https://www.icloud.com/mail"),
    ("me.com", "https://www.icloud.com/mail"),
    ("mac.com", "https://www.icloud.com/mail"),
    ("aol.com", "https://mail.aol.com"),
    ("yandex.com", "https://mail.yandex.com"),
    ("protonmail.com", "https://mail.protonmail.com"),
    ("zoho.com", "https://mail.zoho.com"),
];

/// Webmail URL for the provider hosting `email`.
///
/// The domain is whatever follows the first `@` up to the next one, matched
/// exactly. Unknown domains fall back to Gmail.
pub fn webmail_url(email: Option<&str>) -> &'static str {
    let Some(domain) = email.and_then(|e| e.split('@').nth(1)) else {
        return DEFAULT_WEBMAIL;
    };

    PROVIDERS
        .iter()
        .find(|(known, _)| *known == domain)
        .map_or(DEFAULT_WEBMAIL, |&(_, url)| url)
}
