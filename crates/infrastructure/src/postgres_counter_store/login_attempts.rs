use super::*;

impl PostgresCounterStore {
    pub(super) async fn find_login_attempt_impl(
        &self,
        identifier: &ClientIdentifier,
    ) -> AppResult<Option<LoginAttemptRecord>> {
        let row = sqlx::query_as::<_, LoginAttemptRow>(
            r#"
            SELECT identifier, attempts, locked_until, updated_at
            FROM login_attempts
            WHERE identifier = $1
            "#,
        )
        .bind(identifier.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load login attempts", error))?;

        row.map(LoginAttemptRecord::try_from).transpose()
    }

    pub(super) async fn increment_failures_impl(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<u32> {
        // UPSERT: insert at one failure or increment. An elapsed lock restarts
        // the count; both CASE arms read the pre-update row.
        let attempts = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO login_attempts (identifier, attempts, locked_until, updated_at)
            VALUES ($1, 1, NULL, $2)
            ON CONFLICT (identifier) DO UPDATE
            SET
                attempts = CASE
                    WHEN login_attempts.locked_until IS NOT NULL
                        AND login_attempts.locked_until <= $2
                    THEN 1
                    ELSE login_attempts.attempts + 1
                END,
                locked_until = CASE
                    WHEN login_attempts.locked_until IS NOT NULL
                        AND login_attempts.locked_until <= $2
                    THEN NULL
                    ELSE login_attempts.locked_until
                END,
                updated_at = $2
            RETURNING attempts
            "#,
        )
        .bind(identifier.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| store_error("failed to record failed login", error))?;

        count_from_row(attempts, "attempts")
    }

    pub(super) async fn lock_impl(
        &self,
        identifier: &ClientIdentifier,
        locked_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE login_attempts
            SET locked_until = $2, updated_at = $3
            WHERE identifier = $1
            "#,
        )
        .bind(identifier.as_str())
        .bind(locked_until)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to lock login identifier", error))?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_if_lock_expired_impl(
        &self,
        identifier: &ClientIdentifier,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM login_attempts
            WHERE identifier = $1
              AND locked_until IS NOT NULL
              AND locked_until <= $2
            "#,
        )
        .bind(identifier.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to reset expired login lock", error))?;

        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_login_attempt_impl(
        &self,
        identifier: &ClientIdentifier,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM login_attempts WHERE identifier = $1")
            .bind(identifier.as_str())
            .execute(&self.pool)
            .await
            .map_err(|error| store_error("failed to clear login attempts", error))?;

        Ok(())
    }

    pub(super) async fn purge_stale_login_attempts_impl(
        &self,
        updated_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM login_attempts
            WHERE updated_at < $1
              AND (locked_until IS NULL OR locked_until <= $2)
            "#,
        )
        .bind(updated_before)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|error| store_error("failed to purge stale login attempts", error))?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoginAttemptRow {
    identifier: String,
    attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LoginAttemptRow> for LoginAttemptRecord {
    type Error = AppError;

    fn try_from(row: LoginAttemptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            identifier: ClientIdentifier::new(row.identifier)?,
            attempts: count_from_row(row.attempts, "attempts")?,
            locked_until: row.locked_until,
            updated_at: row.updated_at,
        })
    }
}
