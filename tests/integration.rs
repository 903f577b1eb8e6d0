//! # Integration Tests
//!
//! These tests send HTTP requests to a running analytics server backed by
//! PostgreSQL. They are ignored by default.
//!
//! ## Running Tests
//!
//! ```bash
//! # 1. Start PostgreSQL with the orders schema loaded
//! # 2. Start the server (in another terminal)
//! cargo run
//!
//! # 3. Run tests
//! cargo test --test integration -- --ignored
//! ```

#[cfg(test)]
mod tests {
    fn base_url() -> String {
        std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
    }

    fn authed(path: &str) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .get(format!("{}/api/analytics{}", base_url(), path))
            .bearer_auth("integration-test")
    }

    #[tokio::test]
    #[ignore = "requires a running server"]
    async fn test_health() {
        let res = reqwest::get(format!("{}/health", base_url()))
            .await
            .expect("Failed to send request");

        assert_eq!(res.status(), 200, "Expected 200 OK");
    }

    #[tokio::test]
    #[ignore = "requires a running server"]
    async fn test_dashboard_requires_token() {
        let res = reqwest::get(format!("{}/api/analytics/dashboard", base_url()))
            .await
            .expect("Failed to send request");

        assert_eq!(res.status(), 401, "Expected 401 Unauthorized");
    }

    #[tokio::test]
    #[ignore = "requires a running server"]
    async fn test_dashboard_report() {
        let res = authed("/dashboard?period=7d")
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(res.status(), 200, "Expected 200 OK");

        let body: serde_json::Value = res.json().await.expect("Failed to parse response");
        assert_eq!(body["success"], true);
        assert!(
            body["data"]["overview"]["totalRevenue"].is_number(),
            "Overview should contain total revenue"
        );
        assert!(body["data"]["salesByDay"].is_array());
        assert_eq!(body["data"]["period"].as_str().unwrap(), "7d");
    }

    #[tokio::test]
    #[ignore = "requires a running server"]
    async fn test_customer_and_product_reports() {
        for (path, field) in [("/customers", "segments"), ("/products", "performance")] {
            let res = authed(path).send().await.expect("Failed to send request");
            assert_eq!(res.status(), 200, "Expected 200 OK for {}", path);

            let body: serde_json::Value = res.json().await.expect("Failed to parse response");
            assert!(body["data"][field].is_array(), "{} should contain {}", path, field);
        }
    }

    #[tokio::test]
    #[ignore = "requires a running server"]
    async fn test_compare() {
        let res = authed("/compare?current=7d&previous=90d")
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(res.status(), 200, "Expected 200 OK");

        let body: serde_json::Value = res.json().await.expect("Failed to parse response");
        assert!(body["data"]["comparison"]["revenue"]["change"].is_number());
        assert_eq!(body["data"]["previousPeriod"].as_str().unwrap(), "90d");
    }
}
