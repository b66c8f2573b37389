//! Integration tests against a live booru API.
//!
//! These tests hit the real network and are off by default.
//!
//! Run with: cargo test --features integ_test --test live_search

#[cfg(feature = "integ_test")]
mod tests {
    use std::time::Duration;

    use boorubot::searchbot::gateway::{GatewaySettings, PhilomenaClient, SearchBackend};
    use boorubot::searchbot::query::{SearchOptions, TagQuery};

    /// API host under test (override with BOORU_TEST_HOST).
    fn test_host() -> String {
        std::env::var("BOORU_TEST_HOST").unwrap_or_else(|_| "derpibooru.org".to_string())
    }

    fn client() -> PhilomenaClient {
        PhilomenaClient::new(GatewaySettings {
            host: test_host(),
            api_key: std::env::var("BOORU_TEST_KEY").unwrap_or_default(),
            filter_id: 100073,
            verbose_errors: true,
            timeout: Duration::from_secs(30),
            proxy: None,
        })
        .expect("Failed to build client")
    }

    #[tokio::test]
    async fn test_tag_search_returns_results() {
        let query = TagQuery {
            tags: vec!["safe".to_string()],
            options: SearchOptions { per_page: 5, ..Default::default() },
        };

        let images = client().search_tags(&query).await.expect("tag search failed");
        assert!(!images.is_empty());
        assert!(images.len() <= 5);

        for image in &images {
            assert!(image.id > 0);
            assert!(image.representations.large.starts_with("http"));
        }
    }

    #[tokio::test]
    async fn test_unmatchable_tag_is_no_match() {
        let query = TagQuery {
            tags: vec!["this_tag_certainly_does_not_exist_9f8e7d6c".to_string()],
            options: SearchOptions::default(),
        };

        let err = client().search_tags(&query).await.expect_err("expected no match");
        assert_eq!(err, boorubot::searchbot::SearchError::NoMatch);
    }
}
