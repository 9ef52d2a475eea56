mod common;

use chrono::Utc;
use common::{count_requests, create_user, insert_requests};
use deepsearch::models::User;
use deepsearch::services::quota::{self, QuotaStatus};

async fn load_user(pool: &sqlx::PgPool, id: &str) -> User {
    deepsearch::db::user::fetch(pool, id)
        .await
        .unwrap()
        .expect("user exists")
}

#[tokio::test]
async fn concurrent_requests_cannot_overrun_the_limit() {
    let app = match common::spawn_app().await {
        Some(app) => app,
        None => return,
    };
    create_user(&app.db_pool, "user-1", false).await;
    insert_requests(&app.db_pool, "user-1", 4).await;
    let user = load_user(&app.db_pool, "user-1").await;

    let attempts = (0..6).map(|_| quota::consume(&app.db_pool, &user, 5, Utc::now()));
    let statuses: Vec<QuotaStatus> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|status| status.unwrap())
        .collect();

    let allowed = statuses.iter().filter(|s| !s.is_exceeded()).count();
    assert_eq!(allowed, 1, "statuses: {:?}", statuses);
    assert_eq!(count_requests(&app.db_pool, "user-1").await, 5);
}

#[tokio::test]
async fn exceeded_quota_records_nothing_and_admins_always_record() {
    let app = match common::spawn_app().await {
        Some(app) => app,
        None => return,
    };
    create_user(&app.db_pool, "user-1", false).await;
    create_user(&app.db_pool, "admin", true).await;
    insert_requests(&app.db_pool, "user-1", 2).await;
    insert_requests(&app.db_pool, "admin", 2).await;

    let user = load_user(&app.db_pool, "user-1").await;
    let status = quota::consume(&app.db_pool, &user, 2, Utc::now()).await.unwrap();
    assert_eq!(status, QuotaStatus::Exceeded { used: 2, limit: 2 });
    assert_eq!(count_requests(&app.db_pool, "user-1").await, 2);

    let admin = load_user(&app.db_pool, "admin").await;
    let status = quota::consume(&app.db_pool, &admin, 2, Utc::now()).await.unwrap();
    assert_eq!(status, QuotaStatus::Unlimited);
    assert_eq!(count_requests(&app.db_pool, "admin").await, 3);
}
