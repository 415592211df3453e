pub mod models;
pub mod queries;
pub mod store;

#[cfg(test)]
pub(crate) async fn memory_pool() -> sqlx::SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();
    pool
}
