use std::sync::Arc;

use faculty_directory::config::{AppConfig, StoreBackend};
use faculty_directory::error::AppError;
use faculty_directory::models::NewFaculty;
use faculty_directory::services::Directory;
use faculty_directory::store::PostgrestStore;

fn live_directory() -> Directory {
    dotenvy::dotenv().ok();
    let config = AppConfig::new_from_env().expect("SUPABASE_URL and a key must be set");
    match config.backend {
        StoreBackend::Postgrest(postgrest) => {
            Directory::new(Arc::new(PostgrestStore::new(postgrest).expect("client")))
        }
        StoreBackend::Sqlite { .. } => panic!("unset DATABASE_URL to run live tests"),
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test --test postgrest_live_test -- --ignored --test-threads=1
async fn live_reads_succeed() {
    let dir = live_directory();

    dir.departments.try_get_all().await.expect("departments");
    dir.faculty.try_get_all().await.expect("faculty");
    dir.faculty.try_search("prof").await.expect("search");
    let counts = dir.stats.dashboard_counts().await;
    println!("dashboard: {:?}", counts);
}

#[tokio::test]
#[ignore]
async fn live_faculty_lifecycle() {
    let dir = live_directory();
    let email = format!("live-test-{}@example.invalid", chrono::Utc::now().timestamp_millis());

    let created = dir
        .faculty
        .create(&NewFaculty {
            name: "Live Test".to_string(),
            email: Some(email.clone()),
            ..Default::default()
        })
        .await
        .expect("create");

    let duplicate = dir
        .faculty
        .create(&NewFaculty {
            name: "Live Test Again".to_string(),
            email: Some(email),
            ..Default::default()
        })
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    assert!(dir.faculty.get_by_id(created.faculty_id).await.is_some());
    assert!(dir.faculty.delete(created.faculty_id).await.expect("delete"));
    assert!(dir.faculty.get_by_id(created.faculty_id).await.is_none());
}
