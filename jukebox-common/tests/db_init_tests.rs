//! Database initialization tests against a real file on disk

use jukebox_common::db::init_database;

#[tokio::test]
async fn test_init_database_creates_file_and_parent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("jukebox.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_reopening_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jukebox.db");

    {
        let pool = init_database(&db_path).await.unwrap();
        sqlx::query("INSERT INTO songs (path, title) VALUES ('/music/a.ogg', 'A')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let title: String = sqlx::query_scalar("SELECT title FROM songs WHERE path = '/music/a.ogg'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "A");
}
