use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::TranslationService;
use crate::config::{Throttle, TranslateConfig};
use crate::error::{Result, SubweaveError};

/// Client for the public Google Translate web endpoints
pub struct GoogleTranslator {
    client: Client,
    config: TranslateConfig,
    next_endpoint: AtomicUsize,
    requests: AtomicU64,
    errors: AtomicU64,
}

impl GoogleTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        if config.endpoints.is_empty() {
            return Err(SubweaveError::Config(
                "translate.endpoints must not be empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config,
            next_endpoint: AtomicUsize::new(0),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    /// Endpoints are used round-robin, one per request
    fn endpoint(&self) -> &str {
        let i = self.next_endpoint.fetch_add(1, Ordering::Relaxed);
        &self.config.endpoints[i % self.config.endpoints.len()]
    }

    fn error_ratio(&self) -> f64 {
        let requests = self.requests.load(Ordering::Relaxed);
        if requests == 0 {
            0.0
        } else {
            self.errors.load(Ordering::Relaxed) as f64 / requests as f64
        }
    }

    fn pause_before_request(&self) -> Duration {
        let base = throttle_delay_ms(self.config.throttle, self.error_ratio());
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::thread_rng().gen_range(0..=base / 4);
        Duration::from_millis(base + jitter)
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let endpoint = self.endpoint();
        debug!("Translating {} chars via {}", text.len(), endpoint);

        let response = self
            .client
            .get(endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SubweaveError::Quota {
                status: status.as_u16(),
            });
        }
        if status.is_server_error() {
            return Err(SubweaveError::ServiceUnavailable {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(SubweaveError::Translation(format!(
                "HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let body: Value = response.json().await?;
        parse_response(&body).ok_or_else(|| {
            SubweaveError::Translation("unrecognized response shape".to_string())
        })
    }
}

#[async_trait]
impl TranslationService for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let stripped = text.trim();
        if stripped.is_empty() {
            return Ok(text.to_string());
        }

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            let pause = self.pause_before_request();
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            self.requests.fetch_add(1, Ordering::Relaxed);

            match self.request(stripped, source, target).await {
                Ok(translated) if !translated.trim().is_empty() && translated.trim() != stripped => {
                    return Ok(translated);
                }
                Ok(_) => {
                    warn!(
                        "Attempt {} returned empty or unchanged text for '{}'",
                        attempt + 1,
                        preview(stripped)
                    );
                    last_error = Some(SubweaveError::Translation(
                        "empty or unchanged translation".to_string(),
                    ));
                }
                Err(e) if e.is_retryable() => {
                    warn!("Attempt {} failed: {}; retrying", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    return Err(e);
                }
            }

            if attempt < self.config.max_retries {
                let backoff = self.config.retry_backoff_ms * (attempt as u64 + 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
        }

        self.errors.fetch_add(1, Ordering::Relaxed);
        Err(last_error.unwrap_or_else(|| SubweaveError::Translation("no attempts made".to_string())))
    }
}

/// Base delay in milliseconds; adaptive mode backs off as errors accumulate
pub fn throttle_delay_ms(mode: Throttle, error_ratio: f64) -> u64 {
    match mode {
        Throttle::None => 0,
        Throttle::Mild => 50,
        Throttle::Moderate => 150,
        Throttle::Adaptive => {
            if error_ratio > 0.5 {
                1000
            } else if error_ratio > 0.3 {
                500
            } else if error_ratio > 0.15 {
                250
            } else if error_ratio > 0.05 {
                100
            } else {
                50
            }
        }
    }
}

/// Accepts nested segment arrays, a flat string array, or `sentences[].trans`
pub fn parse_response(body: &Value) -> Option<String> {
    match body {
        Value::Array(items) => match items.first()? {
            Value::Array(segments) => {
                let joined: String = segments
                    .iter()
                    .filter_map(|seg| seg.as_array()?.first()?.as_str())
                    .collect();
                Some(joined)
            }
            Value::String(s) => Some(s.clone()),
            _ => None,
        },
        Value::Object(map) => {
            let sentences = map.get("sentences")?.as_array()?;
            Some(
                sentences
                    .iter()
                    .filter_map(|s| s.get("trans")?.as_str())
                    .collect(),
            )
        }
        _ => None,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> TranslateConfig {
        TranslateConfig {
            endpoints: vec![format!("{}/translate_a/single", server.uri())],
            throttle: Throttle::None,
            retry_backoff_ms: 1,
            max_retries: 2,
            timeout_secs: 5,
            ..TranslateConfig::default()
        }
    }

    #[test]
    fn test_parse_response_shapes() {
        let nested = json!([[["Bonjour ", "Hello ", null], ["le monde", "world", null]], null, "en"]);
        assert_eq!(parse_response(&nested).as_deref(), Some("Bonjour le monde"));

        let flat = json!(["Bonjour", "en"]);
        assert_eq!(parse_response(&flat).as_deref(), Some("Bonjour"));

        let sentences = json!({"sentences": [{"trans": "Bon"}, {"trans": "jour"}]});
        assert_eq!(parse_response(&sentences).as_deref(), Some("Bonjour"));

        assert_eq!(parse_response(&json!(42)), None);
    }

    #[test]
    fn test_throttle_delays() {
        assert_eq!(throttle_delay_ms(Throttle::None, 0.9), 0);
        assert_eq!(throttle_delay_ms(Throttle::Mild, 0.9), 50);
        assert_eq!(throttle_delay_ms(Throttle::Moderate, 0.0), 150);
        assert_eq!(throttle_delay_ms(Throttle::Adaptive, 0.0), 50);
        assert_eq!(throttle_delay_ms(Throttle::Adaptive, 0.2), 250);
        assert_eq!(throttle_delay_ms(Throttle::Adaptive, 0.6), 1000);
    }

    #[tokio::test]
    async fn test_translates_with_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "en"))
            .and(query_param("tl", "fr"))
            .and(query_param("q", "Hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[["Bonjour", "Hello"]]])))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new(config_for(&server)).unwrap();
        let result = translator.translate("  Hello ", "en", "fr").await;
        assert_eq!(tokio_test::assert_ok!(result), "Bonjour");
    }

    #[tokio::test]
    async fn test_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["Salut"])))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new(config_for(&server)).unwrap();
        assert_eq!(translator.translate("Hi", "auto", "fr").await.unwrap(), "Salut");
    }

    #[tokio::test]
    async fn test_quota_exhaustion_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new(config_for(&server)).unwrap();
        let err = translator.translate("Hi", "auto", "fr").await.unwrap_err();
        assert!(matches!(err, SubweaveError::Quota { status: 429 }));
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new(config_for(&server)).unwrap();
        let err = translator.translate("Hi", "auto", "fr").await.unwrap_err();
        assert!(matches!(err, SubweaveError::ServiceUnavailable { status: 502 }));
    }

    #[tokio::test]
    async fn test_timeouts_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(["Salut"]))
                    .set_delay(Duration::from_millis(1_500)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let config = TranslateConfig {
            timeout_secs: 1,
            ..config_for(&server)
        };
        let translator = GoogleTranslator::new(config).unwrap();
        let err = translator.translate("Hi", "auto", "fr").await.unwrap_err();
        assert!(matches!(&err, SubweaveError::Network(e) if e.is_timeout()));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_error_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad language"))
            .expect(1)
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new(config_for(&server)).unwrap();
        let err = translator.translate("Hi", "auto", "xx").await.unwrap_err();
        assert!(err.to_string().contains("bad language"));
    }

    #[tokio::test]
    async fn test_unchanged_text_counts_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["OK"])))
            .mount(&server)
            .await;

        let translator = GoogleTranslator::new(config_for(&server)).unwrap();
        assert!(translator.translate("OK", "en", "fr").await.is_err());
        // Blank input never reaches the service
        assert_eq!(translator.translate("  ", "en", "fr").await.unwrap(), "  ");
    }

    #[tokio::test]
    async fn test_endpoints_rotate() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        for server in [&first, &second] {
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!(["Bonjour"])))
                .expect(1)
                .mount(server)
                .await;
        }

        let config = TranslateConfig {
            endpoints: vec![
                format!("{}/translate_a/single", first.uri()),
                format!("{}/translate_a/t", second.uri()),
            ],
            ..config_for(&first)
        };
        let translator = GoogleTranslator::new(config).unwrap();
        translator.translate("Hello", "en", "fr").await.unwrap();
        translator.translate("Hello again", "en", "fr").await.unwrap();
    }
}
