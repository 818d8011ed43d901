use crate::{Result, Translator};

/// Leaves the text as spoken. Used for English speakers or when no
/// translation service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn translate(&self, text: &str, _source_language: &str) -> Result<String> {
        Ok(text.trim().to_lowercase())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
fn is_english(language: &str) -> bool {
    let lang = language.trim().to_ascii_lowercase();
    lang == "en" || lang.starts_with("en-") || lang.starts_with("en_")
}

#[cfg(feature = "http")]
pub use http::HttpTranslator;

#[cfg(feature = "http")]
mod http {
    use super::is_english;
    use crate::{Result, Translator, TranslatorConfig, VoiceError};
    use std::time::Duration;
    use tracing::debug;

    /// Client for a LibreTranslate-compatible `/translate` endpoint.
    pub struct HttpTranslator {
        endpoint: String,
        api_key: Option<String>,
        client: reqwest::blocking::Client,
    }

    impl HttpTranslator {
        pub fn new(config: &TranslatorConfig) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .map_err(|e| VoiceError::Service(e.to_string()))?;
            Ok(Self {
                endpoint: config.endpoint.clone(),
                api_key: config.api_key.clone(),
                client,
            })
        }
    }

    #[derive(serde::Serialize)]
    struct TranslateReq<'a> {
        q: &'a str,
        source: &'a str,
        target: &'a str,
        format: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        api_key: Option<&'a str>,
    }

    #[derive(serde::Deserialize)]
    struct TranslateResp {
        #[serde(rename = "translatedText")]
        translated_text: String,
    }

    impl Translator for HttpTranslator {
        fn translate(&self, text: &str, source_language: &str) -> Result<String> {
            if is_english(source_language) {
                return Ok(text.trim().to_lowercase());
            }

            let req = TranslateReq {
                q: text,
                source: source_language,
                target: "en",
                format: "text",
                api_key: self.api_key.as_deref(),
            };
            let resp = self
                .client
                .post(&self.endpoint)
                .json(&req)
                .send()
                .map_err(|e| VoiceError::Service(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(VoiceError::Service(format!(
                    "translate: HTTP {}",
                    resp.status()
                )));
            }
            let body: TranslateResp = resp
                .json()
                .map_err(|e| VoiceError::Service(e.to_string()))?;
            debug!("translated {:?} -> {:?}", text, body.translated_text);
            Ok(body.translated_text.trim().to_lowercase())
        }

        fn name(&self) -> &str {
            "http"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{body_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn translate(
            server: &MockServer,
            text: &'static str,
            lang: &'static str,
        ) -> Result<String> {
            let config = TranslatorConfig {
                kind: crate::TranslatorKind::Http,
                endpoint: format!("{}/translate", server.uri()),
                api_key: None,
                timeout_ms: 5_000,
            };
            tokio::task::spawn_blocking(move || HttpTranslator::new(&config)?.translate(text, lang))
                .await
                .unwrap()
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn posts_libretranslate_request() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/translate"))
                .and(body_json(json!({
                    "q": "upar jao",
                    "source": "hi",
                    "target": "en",
                    "format": "text"
                })))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"translatedText": " Go Up "})),
                )
                .expect(1)
                .mount(&server)
                .await;

            assert_eq!(translate(&server, "upar jao", "hi").await.unwrap(), "go up");
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn english_never_reaches_the_service() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(500))
                .expect(0)
                .mount(&server)
                .await;

            let out = translate(&server, "  Take OFF ", "en-GB").await.unwrap();
            assert_eq!(out, "take off");
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn service_failures_are_reported() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(400))
                .mount(&server)
                .await;

            let err = translate(&server, "derecha", "es").await;
            assert!(matches!(err, Err(VoiceError::Service(_))));
        }
    }
}
