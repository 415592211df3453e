use sqlx::SqlitePool;

use super::models::StoredSnapshot;
use crate::services::snapshot::EnvironmentSnapshot;

/// Insert one snapshot row (append-only). Returns the new row id.
///
/// City and pressure are part of the returned snapshot but not of the table.
pub async fn insert_snapshot(
    pool: &SqlitePool,
    snapshot: &EnvironmentSnapshot,
) -> Result<i64, sqlx::Error> {
    let aq = &snapshot.air_quality;
    let weather = &snapshot.weather;

    let result = sqlx::query(
        "INSERT INTO air_quality (
            latitude, longitude, pm25, pm10, o3, no2, so2, co, aqi,
            temperature, humidity, visibility, wind_speed, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(snapshot.location.latitude)
    .bind(snapshot.location.longitude)
    .bind(aq.pm25)
    .bind(aq.pm10)
    .bind(aq.o3)
    .bind(aq.no2)
    .bind(aq.so2)
    .bind(aq.co)
    .bind(aq.aqi)
    .bind(weather.temperature)
    .bind(weather.humidity as f64)
    .bind(weather.visibility)
    .bind(weather.wind_speed)
    .bind(&snapshot.timestamp)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent snapshots, newest first.
pub async fn recent_snapshots(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<StoredSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, StoredSnapshot>(
        "SELECT id, latitude, longitude, pm25, pm10, o3, no2, so2, co, aqi,
                temperature, humidity, visibility, wind_speed, timestamp
         FROM air_quality
         ORDER BY id DESC
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::services::testing::sample_snapshot;

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let pool = memory_pool().await;
        let snapshot = sample_snapshot();

        let id = insert_snapshot(&pool, &snapshot).await.unwrap();
        let rows = recent_snapshots(&pool, 10).await.unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.latitude, 28.6139);
        assert_eq!(row.longitude, 77.209);
        assert_eq!(row.pm25, 12.3);
        assert_eq!(row.aqi, 3);
        assert_eq!(row.humidity, 60.0);
        assert_eq!(row.visibility, 8000.0);
        assert_eq!(row.timestamp, snapshot.timestamp);
    }

    #[tokio::test]
    async fn test_rows_are_appended_never_replaced() {
        let pool = memory_pool().await;
        let snapshot = sample_snapshot();

        let first = insert_snapshot(&pool, &snapshot).await.unwrap();
        let second = insert_snapshot(&pool, &snapshot).await.unwrap();
        assert!(second > first);

        let rows = recent_snapshots(&pool, 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, second, "newest row first");
    }

    #[tokio::test]
    async fn test_recent_snapshots_respects_limit() {
        let pool = memory_pool().await;
        let snapshot = sample_snapshot();
        for _ in 0..5 {
            insert_snapshot(&pool, &snapshot).await.unwrap();
        }

        assert_eq!(recent_snapshots(&pool, 3).await.unwrap().len(), 3);
    }
}
