//! Session store: one JSON session aggregate per conversation

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::Database;
use crate::session::{ConversationId, Form, FormState, FormUpdate, Session, SessionUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No session for conversation {0}")]
    NotFound(ConversationId),

    #[error("Session for conversation {conversation} is corrupt: {source}")]
    Corrupt {
        conversation: ConversationId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Session for conversation {0} already exists")]
    AlreadyExists(ConversationId),

    #[error("Conversation {0} has no form")]
    NoActiveForm(ConversationId),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn exists(&self, id: ConversationId) -> StoreResult<bool> {
        let conn = self.db.lock().await;
        let found = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE conversation_id = ?1",
                params![id.0],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create a fresh idle session; fails if one is already stored
    pub async fn create(&self, id: ConversationId) -> StoreResult<Session> {
        let conn = self.db.lock().await;
        if Self::load_raw(&conn, id)?.is_some() {
            return Err(StoreError::AlreadyExists(id));
        }
        let session = Session::new();
        Self::insert(&conn, id, &session)?;
        tracing::debug!(conversation = %id, "Created session");
        Ok(session)
    }

    /// Read the session, creating it first if the conversation is new
    pub async fn get_or_create(&self, id: ConversationId) -> StoreResult<Session> {
        let conn = self.db.lock().await;
        match Self::load(&conn, id) {
            Ok((session, _)) => Ok(session),
            Err(StoreError::NotFound(_)) => {
                let session = Session::new();
                Self::insert(&conn, id, &session)?;
                tracing::debug!(conversation = %id, "Created session");
                Ok(session)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn read(&self, id: ConversationId) -> StoreResult<Session> {
        let conn = self.db.lock().await;
        Self::load(&conn, id).map(|(session, _)| session)
    }

    /// Overwrite whatever is stored (including unreadable bytes) with a fresh session
    pub async fn reset(&self, id: ConversationId) -> StoreResult<Session> {
        let conn = self.db.lock().await;
        let session = Session::new();
        let data = serde_json::to_string(&session)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO sessions (conversation_id, data, version, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)
             ON CONFLICT(conversation_id) DO UPDATE SET
                data = excluded.data,
                version = sessions.version + 1,
                updated_at = excluded.updated_at",
            params![id.0, data, now],
        )?;
        tracing::warn!(conversation = %id, "Session reset");
        Ok(session)
    }

    /// Every conversation with a stored session
    pub async fn list_ids(&self) -> StoreResult<Vec<ConversationId>> {
        let conn = self.db.lock().await;
        let mut stmt =
            conn.prepare("SELECT conversation_id FROM sessions ORDER BY conversation_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(ConversationId))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Number of writes the stored row has seen
    pub async fn version(&self, id: ConversationId) -> StoreResult<u64> {
        let conn = self.db.lock().await;
        Self::load(&conn, id).map(|(_, version)| version)
    }

    /// Read-modify-write under the connection lock and a transaction.
    ///
    /// Nothing is written when `f` returns an error.
    pub async fn try_modify<T, E, F>(&self, id: ConversationId, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Session) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let (mut session, version) = Self::load(&tx, id)?;

        let out = f(&mut session)?;

        Self::write(&tx, id, &session, version)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    pub async fn modify<T, F>(&self, id: ConversationId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Session) -> T,
    {
        self.try_modify(id, |session| Ok::<_, StoreError>(f(session))).await
    }

    /// Set only the fields present in `update`
    pub async fn apply_update(&self, id: ConversationId, update: SessionUpdate) -> StoreResult<()> {
        self.modify(id, |session| update.apply(session)).await
    }

    /// Append a placeholder form; returns its id
    pub async fn insert_empty_form(&self, id: ConversationId) -> StoreResult<usize> {
        self.modify(id, |session| session.push_empty_form()).await
    }

    pub async fn update_last_form(
        &self,
        id: ConversationId,
        update: FormUpdate,
    ) -> StoreResult<()> {
        self.try_modify(id, |session| match session.last_form_mut() {
            Some(form) => {
                update.apply(form);
                Ok(())
            }
            None => Err(StoreError::NoActiveForm(id)),
        })
        .await
    }

    pub async fn last_form(&self, id: ConversationId) -> StoreResult<Form> {
        let session = self.read(id).await?;
        session
            .last_form()
            .cloned()
            .ok_or(StoreError::NoActiveForm(id))
    }

    pub async fn upsert_form_status(
        &self,
        id: ConversationId,
        state: FormState,
    ) -> StoreResult<()> {
        self.modify(id, |session| session.upsert_form_status(state)).await
    }

    /// Record a newly observed price for a form
    pub async fn record_price(
        &self,
        id: ConversationId,
        form_id: usize,
        date: NaiveDate,
        price: &str,
    ) -> StoreResult<()> {
        self.modify(id, |session| match session.form_status_mut(form_id) {
            Some(state) => {
                state.price = price.to_string();
                state.checked_at = Some(Utc::now());
            }
            None => session.upsert_form_status(FormState::new(form_id, date, price)),
        })
        .await
    }

    /// Flip the watching flag; returns false if the form was never monitored
    pub async fn set_watching(
        &self,
        id: ConversationId,
        form_id: usize,
        watching: bool,
    ) -> StoreResult<bool> {
        self.modify(id, |session| match session.form_status_mut(form_id) {
            Some(state) => {
                state.watching = watching;
                true
            }
            None => false,
        })
        .await
    }

    fn load_raw(conn: &Connection, id: ConversationId) -> StoreResult<Option<(String, u64)>> {
        let row = conn
            .query_row(
                "SELECT data, version FROM sessions WHERE conversation_id = ?1",
                params![id.0],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(row.map(|(data, version)| (data, version.max(0) as u64)))
    }

    fn load(conn: &Connection, id: ConversationId) -> StoreResult<(Session, u64)> {
        let (data, version) = Self::load_raw(conn, id)?.ok_or(StoreError::NotFound(id))?;
        let session = serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            conversation: id,
            source,
        })?;
        Ok((session, version))
    }

    fn insert(conn: &Connection, id: ConversationId, session: &Session) -> StoreResult<()> {
        let data = serde_json::to_string(session)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO sessions (conversation_id, data, version, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)",
            params![id.0, data, now],
        )?;
        Ok(())
    }

    fn write(
        conn: &Connection,
        id: ConversationId,
        session: &Session,
        version: u64,
    ) -> StoreResult<()> {
        let data = serde_json::to_string(session)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE sessions SET data = ?1, version = ?2, updated_at = ?3 WHERE conversation_id = ?4",
            params![data, (version + 1) as i64, now, id.0],
        )?;
        Ok(())
    }
}
