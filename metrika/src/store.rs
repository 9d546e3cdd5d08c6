use crate::errors::MetrikaError;
use crate::summary::TrafficSummary;
use sqlx::PgPool;

#[derive(Clone)]
pub struct TrafficStore {
    pool: PgPool,
}

impl TrafficStore {
    pub fn new(pool: PgPool) -> Self {
        TrafficStore { pool }
    }

    /// Store one summary batch for a counter. All rows commit together or
    /// not at all; a failed insert rolls the whole batch back.
    pub async fn save_summary(
        &self,
        counter_id: u64,
        rows: &[TrafficSummary],
    ) -> Result<(), MetrikaError> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                "INSERT INTO traffic_summaries
                     (counter_id, traffic_source, total_visits, total_users,
                      avg_bounce_rate, avg_page_depth, avg_visit_duration)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(counter_id as i64)
            .bind(&row.traffic_source)
            .bind(row.total_visits)
            .bind(row.total_users)
            .bind(row.avg_bounce_rate)
            .bind(row.avg_page_depth)
            .bind(&row.avg_visit_duration)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
