//! Remote speech-to-text over HTTP.

use crate::{Recognizer, RecognizerConfig, Result, VoiceError};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Encode mono 16-bit PCM as an in-memory WAV file.
pub fn encode_wav(pcm: &[i16], sample_rate_hz: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::with_capacity(44 + pcm.len() * 2);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)
            .map_err(|e| VoiceError::Audio(e.to_string()))?;
        for &sample in pcm {
            writer
                .write_sample(sample)
                .map_err(|e| VoiceError::Audio(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| VoiceError::Audio(e.to_string()))?;
    }
    Ok(buf)
}

/// Posts each utterance as `audio/wav` and expects `{"text": ...}` or plain text back.
pub struct HttpRecognizer {
    endpoint: String,
    token: Option<String>,
    client: Client,
}

impl HttpRecognizer {
    pub fn new(config: &RecognizerConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(VoiceError::Service("recognizer endpoint not configured".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| VoiceError::Service(e.to_string()))?;
        let token = config
            .token
            .clone()
            .or_else(|| std::env::var("SPEECH_API_TOKEN").ok());
        Ok(Self {
            endpoint: config.endpoint.clone(),
            token,
            client,
        })
    }
}

/// Pull the transcript out of a service response body.
fn transcript_from_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(text) = value.get("text").and_then(|t| t.as_str()) {
            return text.trim().to_string();
        }
        if let Some(text) = value.as_str() {
            return text.trim().to_string();
        }
    }
    body.trim().to_string()
}

impl Recognizer for HttpRecognizer {
    fn recognize(&self, pcm: &[i16], sample_rate_hz: u32, language: &str) -> Result<String> {
        let wav = encode_wav(pcm, sample_rate_hz)?;

        let mut req = self
            .client
            .post(&self.endpoint)
            .query(&[("language", language)])
            .header(CONTENT_TYPE, "audio/wav")
            .body(wav);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let resp = req
            .send()
            .map_err(|e| VoiceError::Service(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(VoiceError::Service(format!(
                "recognizer: HTTP {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .map_err(|e| VoiceError::Service(e.to_string()))?;
        debug!("recognizer response: {}", body);

        let text = transcript_from_body(&body);
        if text.is_empty() {
            return Err(VoiceError::NotUnderstood);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_has_riff_header_and_payload() {
        let wav = encode_wav(&[0, 1000, -1000, 0], 16_000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 8);
    }

    #[test]
    fn transcript_accepts_json_or_plain_text() {
        assert_eq!(transcript_from_body(r#"{"text":" go up "}"#), "go up");
        assert_eq!(transcript_from_body(r#""land""#), "land");
        assert_eq!(transcript_from_body("take off\n"), "take off");
        assert_eq!(transcript_from_body(r#"{"text":""}"#), "");
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        assert!(HttpRecognizer::new(&RecognizerConfig::default()).is_err());
    }

    mod service {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn config(server: &MockServer, token: Option<&str>) -> RecognizerConfig {
            RecognizerConfig {
                endpoint: format!("{}/stt", server.uri()),
                token: token.map(str::to_string),
                timeout_ms: 5_000,
            }
        }

        /// The blocking client must not run on an async worker.
        async fn recognize(config: RecognizerConfig, pcm: Vec<i16>, lang: &'static str) -> Result<String> {
            tokio::task::spawn_blocking(move || {
                HttpRecognizer::new(&config)?.recognize(&pcm, 16_000, lang)
            })
            .await
            .unwrap()
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn uploads_wav_with_language_and_token() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/stt"))
                .and(query_param("language", "hi"))
                .and(header("content-type", "audio/wav"))
                .and(header("authorization", "Bearer secret"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": " upar "})))
                .expect(1)
                .mount(&server)
                .await;

            let text = recognize(config(&server, Some("secret")), vec![0, 500, -500], "hi")
                .await
                .unwrap();
            assert_eq!(text, "upar");

            let requests = server.received_requests().await.unwrap();
            assert_eq!(&requests[0].body[..4], b"RIFF");
            assert_eq!(requests[0].body.len(), 44 + 6);
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn empty_transcript_is_not_understood() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_string("  "))
                .mount(&server)
                .await;
            let err = recognize(config(&server, Some("t")), vec![0; 16], "en").await;
            assert!(matches!(err, Err(VoiceError::NotUnderstood)));
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn http_errors_are_service_errors() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&server)
                .await;
            let err = recognize(config(&server, Some("t")), vec![0; 16], "en").await;
            assert!(matches!(err, Err(VoiceError::Service(msg)) if msg.contains("503")));
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn token_falls_back_to_the_environment() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(header("authorization", "Bearer from-env"))
                .respond_with(ResponseTemplate::new(200).set_body_string("land"))
                .expect(1)
                .mount(&server)
                .await;
            std::env::set_var("SPEECH_API_TOKEN", "from-env");
            let text = recognize(config(&server, None), vec![0; 16], "en").await;
            assert_eq!(text.unwrap(), "land");
        }
    }
}
