//! Routing, health check, and transport failure integration tests.

#[cfg(test)]
mod tests {
    use crate::{FakeStorage, TestGateway, gateway_config, gateway_config_for_endpoint, http_client};

    #[tokio::test]
    async fn test_should_answer_health_checks() {
        let storage = FakeStorage::start(&[]).await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        for path in ["/health", "/_health"] {
            let resp = http_client()
                .get(gateway.url(path))
                .send()
                .await
                .expect("request");
            assert_eq!(resp.status(), 200);
            assert_eq!(resp.headers()["content-type"], "application/json");
            let body: serde_json::Value = resp.json().await.expect("json body");
            assert_eq!(body["status"], "running");
        }
        assert!(storage.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_tag_every_response_with_request_id() {
        let storage = FakeStorage::start(&[]).await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;
        let client = http_client();

        let first = client.get(gateway.url("/health")).send().await.expect("request");
        let second = client.get(gateway.url("/nope")).send().await.expect("request");

        let first_id = first.headers()["x-request-id"].to_str().expect("ascii");
        let second_id = second.headers()["x-request-id"].to_str().expect("ascii");
        assert_eq!(first_id.len(), 36);
        assert_ne!(first_id, second_id);
    }

    #[tokio::test]
    async fn test_should_not_find_unknown_paths() {
        let storage = FakeStorage::start(&[]).await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(gateway.url("/api/v2/public/logo.png"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 404);
        assert_eq!(resp.text().await.expect("body"), "Not found");
    }

    #[tokio::test]
    async fn test_should_reject_non_get_methods() {
        let storage = FakeStorage::start(&[]).await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .post(gateway.url("/api/s3/public/logo.png"))
            .body("payload")
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 405);
        assert_eq!(resp.headers()["allow"], "GET");
        assert!(storage.requests().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_keys_that_are_not_utf8() {
        let storage = FakeStorage::start(&[]).await;
        let gateway = TestGateway::start(gateway_config(&storage)).await;

        let resp = http_client()
            .get(gateway.url("/api/s3/public/%FF%FE.png"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 400);
        assert_eq!(resp.text().await.expect("body"), "Invalid object key encoding");
    }

    #[tokio::test]
    async fn test_should_return_bad_gateway_when_storage_is_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let dead = listener.local_addr().expect("address");
        drop(listener);

        let gateway =
            TestGateway::start(gateway_config_for_endpoint(&format!("http://{dead}"))).await;

        let resp = http_client()
            .get(gateway.url("/api/s3/public/logo.png"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 502);
        assert_eq!(resp.text().await.expect("body"), "Bad gateway");
    }

    #[tokio::test]
    async fn test_should_report_invalid_endpoint_as_misconfiguration() {
        let gateway = TestGateway::start(gateway_config_for_endpoint("ftp://storage.internal")).await;

        let resp = http_client()
            .get(gateway.url("/api/s3/public/logo.png"))
            .send()
            .await
            .expect("request");

        assert_eq!(resp.status(), 500);
        assert_eq!(
            resp.text().await.expect("body"),
            "Server misconfigured: invalid signing settings"
        );
    }
}
