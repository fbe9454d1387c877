//! Private (token-gated) route integration tests.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        FakeStorage, StoredObject, TOKEN_SECRET, TestGateway, epoch_seconds, gateway_config,
        http_client, sign_token,
    };

    const REPORT_KEY: &str = "reports/q1.pdf";

    async fn storage() -> FakeStorage {
        FakeStorage::start(&[(
            REPORT_KEY,
            StoredObject {
                content_type: Some("application/pdf"),
                body: b"%PDF-1.7 quarterly numbers",
            },
        )])
        .await
    }

    fn report_url(gateway: &TestGateway, token: &str) -> String {
        gateway.url(&format!("/api/s3/private/{REPORT_KEY}?token={token}"))
    }

    fn live_token(sub: &str) -> String {
        sign_token(&json!({ "sub": sub, "exp": epoch_seconds(600) }), TOKEN_SECRET)
    }

    #[tokio::test]
    async fn test_should_serve_object_for_scoped_token() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(report_url(&gateway, &live_token(REPORT_KEY)))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 200);
        let headers = resp.headers();
        assert_eq!(headers["content-type"], "application/pdf");
        assert_eq!(headers["etag"], "\"d41d8cd98f00b204e9800998ecf8427e\"");
        assert_eq!(headers["cache-control"], "no-store, no-cache, must-revalidate");
        assert_eq!(
            headers["cdn-cache-control"],
            "public, max-age=31536000, immutable"
        );
        assert_eq!(headers["server"], "keygate");
        assert_eq!(
            resp.bytes().await.expect("body").as_ref(),
            b"%PDF-1.7 quarterly numbers"
        );

        let requests = storage.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("/assets/reports/q1.pdf?"));
        assert!(!requests[0].contains("token="));
    }

    #[tokio::test]
    async fn test_should_require_token() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(gateway.url("/api/s3/private/reports/q1.pdf"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 401);
        assert_eq!(resp.text().await.expect("body"), "Missing token");
        assert!(storage.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_token_for_other_object() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(report_url(&gateway, &live_token("reports/q2.pdf")))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 403);
        assert_eq!(resp.text().await.expect("body"), "Scope mismatch");
        assert!(storage.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_expired_token() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;
        let token = sign_token(
            &json!({ "sub": REPORT_KEY, "exp": epoch_seconds(-60) }),
            TOKEN_SECRET,
        );

        let resp = http_client()
            .get(report_url(&gateway, &token))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 403);
        assert_eq!(resp.text().await.expect("body"), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_should_reject_token_signed_with_other_secret() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;
        let token = sign_token(
            &json!({ "sub": REPORT_KEY, "exp": epoch_seconds(600) }),
            "not-the-gateway-secret",
        );

        let resp = http_client()
            .get(report_url(&gateway, &token))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 403);
        assert_eq!(resp.text().await.expect("body"), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_should_reject_malformed_token() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(report_url(&gateway, "not-a-token"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 403);
        assert_eq!(resp.text().await.expect("body"), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_should_deny_every_token_without_secret() {
        let storage = storage().await;
        let mut config = gateway_config(&storage);
        config.jwt_secret = None;
        let gateway = TestGateway::start(config).await;

        let resp = http_client()
            .get(report_url(&gateway, &live_token(REPORT_KEY)))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 403);
        assert_eq!(resp.text().await.expect("body"), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_should_check_private_folder_before_token() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(gateway.url("/api/s3/private/public/logo.png"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 403);
        assert_eq!(resp.text().await.expect("body"), "Access denied: invalid folder");
    }

    #[tokio::test]
    async fn test_should_hide_missing_private_object() {
        let storage = storage().await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;
        let key = "reports/q3.pdf";

        let resp = http_client()
            .get(gateway.url(&format!("/api/s3/private/{key}?token={}", live_token(key))))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 404);
        assert_eq!(
            resp.text().await.expect("body"),
            "File not found or access denied"
        );
    }
}
