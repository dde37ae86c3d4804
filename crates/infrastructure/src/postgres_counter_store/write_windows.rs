use super::*;

impl PostgresCounterStore {
    pub(super) async fn increment_window_impl(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
        policy: WriteBudgetPolicy,
    ) -> AppResult<Option<u32>> {
        let limit = i32::try_from(policy.limit()).unwrap_or(i32::MAX);

        // Conditional UPSERT: the conflict branch only fires below the limit.
        // A full window matches no row and RETURNING yields nothing.
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO write_windows (identifier, window_start, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (identifier, window_start) DO UPDATE
            SET count = write_windows.count + 1
            WHERE write_windows.count < $3
            RETURNING count
            "#,
        )
        .bind(identifier.as_str())
        .bind(window_start)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to consume write budget", error))?;

        count
            .map(|count| count_from_row(count, "count"))
            .transpose()
    }

    pub(super) async fn find_window_impl(
        &self,
        identifier: &ClientIdentifier,
        window_start: DateTime<Utc>,
    ) -> AppResult<Option<WriteWindowCounter>> {
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT count
            FROM write_windows
            WHERE identifier = $1 AND window_start = $2
            "#,
        )
        .bind(identifier.as_str())
        .bind(window_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load write window", error))?;

        count
            .map(|count| -> AppResult<WriteWindowCounter> {
                Ok(WriteWindowCounter {
                    identifier: identifier.clone(),
                    window_start,
                    count: count_from_row(count, "count")?,
                })
            })
            .transpose()
    }

    pub(super) async fn purge_windows_impl(
        &self,
        window_start_before: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM write_windows WHERE window_start < $1")
            .bind(window_start_before)
            .execute(&self.pool)
            .await
            .map_err(|error| store_error("failed to purge write windows", error))?;

        Ok(result.rows_affected())
    }
}
