use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use server::dlq::DeadLetterStore;
use server::entity::shipment;

use crate::common::{ADMIN_TOKEN, CRON_SECRET, TestApp, routes};

mod service_routes {
    use super::*;

    #[tokio::test]
    async fn health_returns_ok() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::HEALTH).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, "OK");
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::OPENAPI).await;
        assert_eq!(res.status, 200);
        let paths = res.body["paths"].as_object().expect("paths should be object");
        assert!(paths.contains_key("/api/v1/dlq/retry-run"));
        assert!(paths.contains_key("/api/v1/dlq/{id}/requeue"));
    }
}

mod trigger_auth {
    use super::*;

    #[tokio::test]
    async fn rejected_trigger_touches_no_store() {
        let app = TestApp::spawn().await;
        app.enqueue(&json!({ "event_type": "load#created", "reference_number": "R" }))
            .await;
        let before = app.store.calls();

        let res = app.post_without_token(routes::RETRY_RUN).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");

        let res = app.post_with_token(routes::RETRY_RUN, "wrong").await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");

        // The admin token is not the trigger secret.
        let res = app.post_with_token(routes::RETRY_RUN, ADMIN_TOKEN).await;
        assert_eq!(res.status, 401);

        assert_eq!(app.store.calls(), before);

        let res = app.post_with_token(routes::RETRY_RUN, CRON_SECRET).await;
        assert_eq!(res.status, 200);
        assert!(app.store.calls() > before);
    }

    #[tokio::test]
    async fn cron_secret_header_is_accepted() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_headers(routes::RETRY_RUN, &[("x-cron-secret", CRON_SECRET)])
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["retried"], 0);
    }

    #[tokio::test]
    async fn basic_authorization_does_not_hide_cron_secret_header() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_headers(
                routes::RETRY_RUN,
                &[
                    ("Authorization", "Basic dXNlcjpwYXNz"),
                    ("x-cron-secret", CRON_SECRET),
                ],
            )
            .await;
        assert_eq!(res.status, 200);

        let res = app
            .post_with_headers(routes::RETRY_RUN, &[("Authorization", "Basic dXNlcjpwYXNz")])
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod retry_run {
    use super::*;

    #[tokio::test]
    async fn run_reconciles_and_drains_the_queue() {
        let app = TestApp::spawn().await;
        app.enqueue(&json!({ "event_type": "load#created", "reference_number": "R-1" }))
            .await;
        app.enqueue(&json!({ "event_type": "foo#bar" })).await;

        let res = app.post_with_token(routes::RETRY_RUN, CRON_SECRET).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["retried"], 2);
        assert_eq!(res.body["succeeded"], 2);
        assert_eq!(res.body["failed"], 0);
        assert_eq!(res.body["applied"], 1);
        assert_eq!(res.body["skipped"], 1);
        assert_eq!(res.body["alerted"], false);

        assert!(app.store.list_items(None).await.unwrap().is_empty());
        let created = shipment::Entity::find()
            .filter(shipment::Column::ReferenceNumber.eq("R-1"))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(created, 1);
    }
}
