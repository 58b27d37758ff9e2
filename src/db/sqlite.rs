use crate::db::models::{
    DbAdminUser, DbMessage, DbSession, DbUser, MessageType, MessageWithSession,
    SYSTEM_STATUS_KEY, SessionWithUser, SystemStatus, UserSummary,
};
use crate::db::schema::SQLITE_INIT;
use crate::error::DeskError;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

const MESSAGE_COLUMNS: &str = "id, content, type, session_id, created_at";
const SESSION_COLUMNS: &str = "id, name, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct DeskStorage {
    pool: SqlitePool,
}

impl DeskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and
    /// bootstrap the schema.
    pub async fn connect(database_url: &str) -> Result<Self, DeskError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), DeskError> {
        // sqlx::query runs a single statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ---- users ----

    pub async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<DbUser, DeskError> {
        let at = stored_time(at);
        let user = DbUser {
            id: new_id(),
            username: username.to_string(),
            email: email.map(str::to_string),
            password_hash: password_hash.to_string(),
            created_at: at,
            updated_at: at,
        };
        sqlx::query(
            "INSERT INTO users (id, username, email, password, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(to_db_time(at))
        .bind(to_db_time(at))
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<DbUser>, DeskError> {
        self.find_user_where("id", id).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<DbUser>, DeskError> {
        self.find_user_where("username", username).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<DbUser>, DeskError> {
        self.find_user_where("email", email).await
    }

    async fn find_user_where(&self, column: &str, value: &str) -> Result<Option<DbUser>, DeskError> {
        let sql = format!(
            "SELECT id, username, email, password, created_at, updated_at \
             FROM users WHERE {column} = ?"
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_user).transpose()
    }

    // ---- admin users ----

    pub async fn admin_exists(&self) -> Result<bool, DeskError> {
        let rec: (i64,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM admin_users)")
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0 != 0)
    }

    /// Insert an admin only while the table is empty. `None` when one exists.
    pub async fn create_admin_if_none(
        &self,
        username: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<DbAdminUser>, DeskError> {
        let at = stored_time(at);
        let admin = DbAdminUser {
            id: new_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: at,
            updated_at: at,
        };
        let res = sqlx::query(
            "INSERT INTO admin_users (id, username, password, created_at, updated_at) \
             SELECT ?, ?, ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM admin_users)",
        )
        .bind(&admin.id)
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(to_db_time(at))
        .bind(to_db_time(at))
        .execute(&self.pool)
        .await?;
        Ok((res.rows_affected() == 1).then_some(admin))
    }

    pub async fn find_admin_by_id(&self, id: &str) -> Result<Option<DbAdminUser>, DeskError> {
        self.find_admin_where("id", id).await
    }

    pub async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DbAdminUser>, DeskError> {
        self.find_admin_where("username", username).await
    }

    async fn find_admin_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<DbAdminUser>, DeskError> {
        let sql = format!(
            "SELECT id, username, password, created_at, updated_at \
             FROM admin_users WHERE {column} = ?"
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_admin).transpose()
    }

    // ---- sessions ----

    pub async fn create_session(
        &self,
        user_id: &str,
        name: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<DbSession, DeskError> {
        let at = stored_time(at);
        let session = DbSession {
            id: new_id(),
            name: name.map(str::to_string),
            user_id: user_id.to_string(),
            created_at: at,
            updated_at: at,
        };
        sqlx::query(
            "INSERT INTO sessions (id, name, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.name)
        .bind(&session.user_id)
        .bind(to_db_time(at))
        .bind(to_db_time(at))
        .execute(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<DbSession>, DeskError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_session).transpose()
    }

    /// Sessions owned by `user_id`, most recently active first.
    pub async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<DbSession>, DeskError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ? ORDER BY updated_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_session).collect()
    }

    pub async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<(), DeskError> {
        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(to_db_time(at))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a session; its messages go with it via `ON DELETE CASCADE`.
    /// Returns whether a row was removed.
    pub async fn delete_session(&self, id: &str) -> Result<bool, DeskError> {
        let res = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn list_sessions_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DbSession>, DeskError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE created_at < ? ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(to_db_time(cutoff))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_session).collect()
    }

    pub async fn delete_sessions_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, DeskError> {
        let res = sqlx::query("DELETE FROM sessions WHERE created_at < ?")
            .bind(to_db_time(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    // ---- messages ----

    pub async fn create_message(
        &self,
        session_id: &str,
        content: &str,
        kind: MessageType,
        at: DateTime<Utc>,
    ) -> Result<DbMessage, DeskError> {
        let at = stored_time(at);
        let message = DbMessage {
            id: new_id(),
            content: content.to_string(),
            kind,
            session_id: session_id.to_string(),
            created_at: at,
        };
        sqlx::query(
            "INSERT INTO messages (id, content, type, session_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.content)
        .bind(kind.as_str())
        .bind(&message.session_id)
        .bind(to_db_time(at))
        .execute(&self.pool)
        .await?;
        Ok(message)
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<DbMessage>, DeskError> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_message).transpose()
    }

    /// Messages of one session in conversation order.
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<DbMessage>, DeskError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_id = ? \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_message).collect()
    }

    /// Every message joined with its session and owner, newest first.
    /// When `kind` is set only messages of that type are returned.
    pub async fn list_messages_with_session(
        &self,
        kind: Option<MessageType>,
    ) -> Result<Vec<MessageWithSession>, DeskError> {
        let filter = if kind.is_some() { "WHERE m.type = ?" } else { "" };
        let sql = format!(
            r#"SELECT m.id, m.content, m.type, m.session_id, m.created_at,
                      s.name AS s_name, s.user_id AS s_user_id,
                      s.created_at AS s_created_at, s.updated_at AS s_updated_at,
                      u.username AS u_username, u.email AS u_email
               FROM messages m
               JOIN sessions s ON s.id = m.session_id
               JOIN users u ON u.id = s.user_id
               {filter}
               ORDER BY m.created_at DESC, m.rowid DESC"#
        );
        let mut query = sqlx::query(&sql);
        if let Some(kind) = kind {
            query = query.bind(kind.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_message_with_session).collect()
    }

    /// Earliest ASSISTANT message in `session_id` created strictly after `after`.
    pub async fn first_reply_after(
        &self,
        session_id: &str,
        after: DateTime<Utc>,
    ) -> Result<Option<DbMessage>, DeskError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE session_id = ? AND type = ? AND created_at > ? \
             ORDER BY created_at ASC, rowid ASC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(session_id)
            .bind(MessageType::Assistant.as_str())
            .bind(to_db_time(after))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_message).transpose()
    }

    pub async fn update_message_content(
        &self,
        id: &str,
        content: &str,
    ) -> Result<Option<DbMessage>, DeskError> {
        let res = sqlx::query("UPDATE messages SET content = ? WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_message(id).await
    }

    pub async fn delete_message(&self, id: &str) -> Result<bool, DeskError> {
        let res = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // ---- system settings ----

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, DeskError> {
        let rec: Option<(String,)> = sqlx::query_as("SELECT value FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rec.map(|r| r.0))
    }

    /// Upsert by unique key.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), DeskError> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(to_db_time(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persisted status flag; `active` until an admin writes otherwise.
    pub async fn system_status(&self) -> Result<SystemStatus, DeskError> {
        match self.get_setting(SYSTEM_STATUS_KEY).await? {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| DeskError::from(sqlx::Error::Decode(e.into()))),
            None => Ok(SystemStatus::default()),
        }
    }

    pub async fn set_system_status(&self, status: SystemStatus) -> Result<(), DeskError> {
        self.set_setting(SYSTEM_STATUS_KEY, status.as_str()).await
    }

    // ---- row mapping ----

    fn row_to_user(row: SqliteRow) -> Result<DbUser, DeskError> {
        Ok(DbUser {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password")?,
            created_at: from_db_time(row.try_get("created_at")?)?,
            updated_at: from_db_time(row.try_get("updated_at")?)?,
        })
    }

    fn row_to_admin(row: SqliteRow) -> Result<DbAdminUser, DeskError> {
        Ok(DbAdminUser {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password")?,
            created_at: from_db_time(row.try_get("created_at")?)?,
            updated_at: from_db_time(row.try_get("updated_at")?)?,
        })
    }

    fn row_to_session(row: SqliteRow) -> Result<DbSession, DeskError> {
        Ok(DbSession {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            user_id: row.try_get("user_id")?,
            created_at: from_db_time(row.try_get("created_at")?)?,
            updated_at: from_db_time(row.try_get("updated_at")?)?,
        })
    }

    fn row_to_message(row: SqliteRow) -> Result<DbMessage, DeskError> {
        let kind_str: String = row.try_get("type")?;
        let kind = kind_str
            .parse::<MessageType>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(DbMessage {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            kind,
            session_id: row.try_get("session_id")?,
            created_at: from_db_time(row.try_get("created_at")?)?,
        })
    }

    fn row_to_message_with_session(row: SqliteRow) -> Result<MessageWithSession, DeskError> {
        let session = DbSession {
            id: row.try_get("session_id")?,
            name: row.try_get("s_name")?,
            user_id: row.try_get("s_user_id")?,
            created_at: from_db_time(row.try_get("s_created_at")?)?,
            updated_at: from_db_time(row.try_get("s_updated_at")?)?,
        };
        let user = UserSummary {
            id: session.user_id.clone(),
            username: row.try_get("u_username")?,
            email: row.try_get("u_email")?,
        };
        let message = Self::row_to_message(row)?;
        Ok(MessageWithSession {
            message,
            session: SessionWithUser { session, user },
        })
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Drop precision the database does not keep, so returned rows match reads.
fn stored_time(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

/// Fixed-width UTC text so SQL string comparison matches time order.
pub fn to_db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(raw: String) -> Result<DateTime<Utc>, DeskError> {
    let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(parsed.with_timezone(&Utc))
}
