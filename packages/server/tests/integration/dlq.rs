use chrono::Utc;
use serde_json::json;

use server::dlq::{AttemptOutcome, DeadLetterStore};

use crate::common::{ADMIN_TOKEN, CRON_SECRET, TestApp, routes};

async fn fail_once(app: &TestApp, id: i32, error: &str) {
    let item = app
        .store
        .get(id)
        .await
        .expect("Failed to load item")
        .expect("item should exist");
    app.store
        .record_attempt(&item, &AttemptOutcome::Failed(error.into()), Utc::now())
        .await
        .expect("Failed to record attempt");
}

mod dlq_access {
    use super::*;

    #[tokio::test]
    async fn listing_without_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::DLQ).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn cron_secret_cannot_clear_the_queue() {
        let app = TestApp::spawn().await;
        app.enqueue(&json!({ "event_type": "load#created", "reference_number": "A" }))
            .await;

        let res = app.delete_with_token(routes::DLQ, CRON_SECRET).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");

        let res = app.get_with_token(routes::DLQ_STATS, ADMIN_TOKEN).await;
        assert_eq!(res.body["count"], 1);
    }
}

mod dlq_listing {
    use super::*;

    #[tokio::test]
    async fn admin_lists_items_with_stats() {
        let app = TestApp::spawn().await;
        app.enqueue(&json!({ "event_type": "load#created", "reference_number": "A" }))
            .await;
        let id = app
            .enqueue(&json!({ "event_type": "load#status_updated", "reference_number": "B" }))
            .await;
        fail_once(&app, id, "boom").await;

        let res = app.get_with_token(routes::DLQ, ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        let items = res.body["items"].as_array().expect("items should be array");
        assert_eq!(items.len(), 2);
        assert_eq!(res.body["stats"]["count"], 2);
        assert_eq!(res.body["stats"]["byEventType"]["load#created"], 1);
        assert_eq!(res.body["stats"]["byEventType"]["load#status_updated"], 1);
        assert_eq!(res.body["stats"]["maxRetriesReached"], 0);
    }

    #[tokio::test]
    async fn limit_caps_the_listing() {
        let app = TestApp::spawn().await;
        for reference in ["A", "B"] {
            app.enqueue(&json!({ "event_type": "load#created", "reference_number": reference }))
                .await;
        }

        let res = app
            .get_with_token(&format!("{}?limit=1", routes::DLQ), ADMIN_TOKEN)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_limit_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_token(&format!("{}?limit=0", routes::DLQ), ADMIN_TOKEN)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn stats_endpoint_counts_items() {
        let app = TestApp::spawn().await;
        for reference in ["A", "B"] {
            app.enqueue(&json!({ "event_type": "load#created", "reference_number": reference }))
                .await;
        }

        let res = app.get_with_token(routes::DLQ_STATS, ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 2);
        assert_eq!(res.body["byEventType"]["load#created"], 2);
    }
}

mod dlq_item {
    use super::*;

    #[tokio::test]
    async fn item_shows_its_retry_history() {
        let app = TestApp::spawn().await;
        let id = app
            .enqueue(&json!({ "event_type": "load#created", "reference_number": "A" }))
            .await;
        fail_once(&app, id, "boom").await;

        let res = app.get_with_token(&routes::dlq_item(id), ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["attemptCount"], 1);
        assert_eq!(res.body["lastError"], "boom");
        assert_eq!(res.body["retryHistory"][0]["error"], "boom");
        assert_eq!(res.body["exhausted"], false);
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(&routes::dlq_item(4242), ADMIN_TOKEN).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod dlq_cleanup {
    use super::*;

    #[tokio::test]
    async fn delete_reports_whether_item_existed() {
        let app = TestApp::spawn().await;
        let id = app.enqueue(&json!({ "event_type": "load#created" })).await;

        let res = app.delete_with_token(&routes::dlq_item(id), ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["removed"], true);

        let res = app.delete_with_token(&routes::dlq_item(id), ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["removed"], false);
    }

    #[tokio::test]
    async fn clear_all_returns_removed_count() {
        let app = TestApp::spawn().await;
        for reference in ["A", "B", "C"] {
            app.enqueue(&json!({ "event_type": "load#created", "reference_number": reference }))
                .await;
        }

        let res = app.delete_with_token(routes::DLQ, ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["removed"], 3);
        assert_eq!(app.store.stats().await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn requeue_resets_attempts() {
        let app = TestApp::spawn().await;
        let id = app.enqueue(&json!({ "event_type": "load#created" })).await;
        fail_once(&app, id, "x").await;

        let res = app.post_with_token(&routes::dlq_requeue(id), ADMIN_TOKEN).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["requeued"], true);
        let item = app.store.get(id).await.unwrap().expect("item should exist");
        assert_eq!(item.attempt_count, 0);

        let res = app.post_with_token(&routes::dlq_requeue(999), ADMIN_TOKEN).await;
        assert_eq!(res.body["requeued"], false);
    }
}
