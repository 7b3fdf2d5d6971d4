//! `PostgreSQL` backends for users and durable sessions.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    SessionQuery, SessionRecord, SessionStore, StoreError, User, UserField, UserQuery, UserStore,
};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Create the tables when they are missing.
///
/// # Errors
/// Returns an error if any schema statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
    {
        sqlx::query(statement)
            .execute(pool)
            .instrument(db_span("DDL", statement))
            .await?;
    }
    Ok(())
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        hashed_password: row.try_get("hashed_password")?,
        session_id: row.try_get("session_id")?,
        reset_token: row.try_get("reset_token")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<SessionRecord, sqlx::Error> {
    Ok(SessionRecord {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, query: &UserQuery) -> Result<Option<User>, StoreError> {
        let criteria = query.criteria();
        if criteria.is_empty() {
            return Err(StoreError::EmptyQuery);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, email, hashed_password, session_id, reset_token FROM users WHERE ",
        );
        let mut conditions = builder.separated(" AND ");
        for (column, value) in criteria {
            conditions.push(format!("{column} = "));
            conditions.push_bind_unseparated(value.to_string());
        }
        builder.push(" ORDER BY created_at LIMIT 1");

        let span = db_span("SELECT", builder.sql());
        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let query = "SELECT COUNT(*) AS total FROM users";
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn add(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (id, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, email, hashed_password, session_id, reset_token
        ";
        let result = sqlx::query(query)
            .bind(Uuid::new_v4().to_string())
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)?),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, id: &str, fields: &[UserField]) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut assignments = builder.separated(", ");
        for field in fields {
            assignments.push(format!("{} = ", field.column()));
            assignments.push_bind_unseparated(field.value().map(str::to_string));
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id.to_string());

        let span = db_span("UPDATE", builder.sql());
        let result = builder.build().execute(&self.pool).instrument(span).await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotFound),
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    // Rows are queried on demand, there is no local index to warm.
    async fn load_all(&self) -> Result<usize, StoreError> {
        let query = "SELECT COUNT(*) AS total FROM user_sessions";
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(usize::try_from(total).unwrap_or_default())
    }

    async fn search(&self, query: &SessionQuery) -> Result<Vec<SessionRecord>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, session_id, user_id, created_at FROM user_sessions");
        let criteria = [
            ("session_id", query.session_id.as_deref()),
            ("user_id", query.user_id.as_deref()),
        ];
        let mut first = true;
        for (column, value) in criteria {
            let Some(value) = value else { continue };
            builder.push(if first { " WHERE " } else { " AND " });
            builder.push(format!("{column} = "));
            builder.push_bind(value.to_string());
            first = false;
        }
        builder.push(" ORDER BY created_at");

        let span = db_span("SELECT", builder.sql());
        let rows = builder.build().fetch_all(&self.pool).instrument(span).await?;

        Ok(rows
            .iter()
            .map(session_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO user_sessions (id, session_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
        ";
        let result = sqlx::query(query)
            .bind(&record.id)
            .bind(&record.session_id)
            .bind(&record.user_id)
            .bind(record.created_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn remove(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let query = "DELETE FROM user_sessions WHERE id = $1";
        let done = sqlx::query(query)
            .bind(&record.id)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
