use super::db::{Database, DatabaseError};
use super::models::PersistedSession;
use super::tables::SESSION_KEY;

impl Database {
    // ========================================================================
    // Session persistence
    // ========================================================================

    /// Load the persisted session, if one was ever saved
    pub fn load_session(&self) -> Result<Option<PersistedSession>, DatabaseError> {
        match self.get_entry(SESSION_KEY)? {
            Some(data) => Ok(Some(rmp_serde::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the persisted session (last write wins)
    pub fn save_session(&self, session: &PersistedSession) -> Result<(), DatabaseError> {
        let data = rmp_serde::to_vec_named(session)?;
        self.put_entry(SESSION_KEY, &data)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::models::PersistedSession;
    use crate::testutil::{make_account, setup_db};

    #[test]
    fn test_missing_session_loads_as_none() {
        let (db, _temp) = setup_db();
        assert!(db.load_session().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_session() {
        let (db, _temp) = setup_db();

        let session = PersistedSession {
            access_token: Some("access-1".to_string()),
            account: Some(make_account(7)),
            is_authenticated: true,
        };
        db.save_session(&session).unwrap();

        assert_eq!(db.load_session().unwrap(), Some(session));
    }

    #[test]
    fn test_save_overwrites_previous_session() {
        let (db, _temp) = setup_db();

        db.save_session(&PersistedSession {
            access_token: Some("old".to_string()),
            account: Some(make_account(1)),
            is_authenticated: true,
        })
        .unwrap();
        db.save_session(&PersistedSession::default()).unwrap();

        assert_eq!(db.load_session().unwrap(), Some(PersistedSession::default()));
    }
}
