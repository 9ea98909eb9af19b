use super::db::{Database, DatabaseError};
use super::models::StoredCookie;
use super::tables::COOKIES_KEY;

impl Database {
    // ========================================================================
    // Cookie persistence
    // ========================================================================

    /// Load the saved cookies, oldest first
    pub fn load_cookies(&self) -> Result<Vec<StoredCookie>, DatabaseError> {
        match self.get_entry(COOKIES_KEY)? {
            Some(data) => Ok(rmp_serde::from_slice(&data)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_cookies(&self, cookies: &[StoredCookie]) -> Result<(), DatabaseError> {
        let data = rmp_serde::to_vec_named(cookies)?;
        self.put_entry(COOKIES_KEY, &data)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::models::StoredCookie;
    use crate::testutil::setup_db;

    fn cookie(name: &str, value: &str) -> StoredCookie {
        StoredCookie {
            host: "127.0.0.1".to_string(),
            name: name.to_string(),
            set_cookie: format!("{name}={value}; Path=/; HttpOnly"),
            url: "http://127.0.0.1:8000/api/accounts/signin/".to_string(),
        }
    }

    #[test]
    fn test_no_cookies_saved() {
        let (db, _temp) = setup_db();
        assert!(db.load_cookies().unwrap().is_empty());
    }

    #[test]
    fn test_cookies_are_stored_apart_from_session() {
        let (db, _temp) = setup_db();

        let cookies = vec![cookie("refresh", "r-1"), cookie("csrftoken", "c-1")];
        db.save_cookies(&cookies).unwrap();

        assert_eq!(db.load_cookies().unwrap(), cookies);
        assert!(db.load_session().unwrap().is_none());
    }
}
