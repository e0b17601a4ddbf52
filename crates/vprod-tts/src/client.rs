//! TTS engine client.

use reqwest::Response;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{TtsError, TtsResult};

/// Synthesis parameters the engine recognizes on the query document.
///
/// Anything outside this set is dropped before the synthesis call.
pub const SYNTH_PARAM_KEYS: &[&str] = &[
    "speedScale",
    "pitchScale",
    "intonationScale",
    "volumeScale",
    "prePhonemeLength",
    "postPhonemeLength",
    "pitch",
    "pauseLength",
    "pauseLengthScale",
    "outputSamplingRate",
    "outputStereo",
];

/// Client for the query-then-synthesize TTS engine.
#[derive(Debug, Clone)]
pub struct TtsClient {
    base_url: String,
    client: reqwest::Client,
}

impl TtsClient {
    /// Create a client against an engine base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TtsResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// Fetch the synthesis parameter document for text + speaker.
    pub async fn audio_query(&self, text: &str, speaker: i64) -> TtsResult<Map<String, Value>> {
        let response = self
            .client
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", text.to_string()), ("speaker", speaker.to_string())])
            .send()
            .await?;
        let response = check_status(response).await?;

        match response.json::<Value>().await? {
            Value::Object(query) => Ok(query),
            other => Err(TtsError::InvalidResponse(format!(
                "audio_query returned non-object: {other}"
            ))),
        }
    }

    /// Turn a (possibly overlaid) query document into raw audio bytes.
    pub async fn synthesis(&self, query: &Map<String, Value>, speaker: i64) -> TtsResult<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", speaker.to_string())])
            .json(query)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Full two-step synthesis with an optional settings overlay.
    pub async fn synthesize(
        &self,
        text: &str,
        speaker: i64,
        overrides: Option<&Map<String, Value>>,
    ) -> TtsResult<Vec<u8>> {
        let mut query = self.audio_query(text, speaker).await?;
        if let Some(overrides) = overrides {
            apply_overrides(&mut query, overrides);
        }
        debug!(speaker, chars = text.chars().count(), "Synthesizing voice");
        self.synthesis(&query, speaker).await
    }
}

/// Overlay recognized synthesis parameters onto a query document.
pub fn apply_overrides(query: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        if SYNTH_PARAM_KEYS.contains(&key.as_str()) {
            query.insert(key.clone(), value.clone());
        }
    }
}

async fn check_status(response: Response) -> TtsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TtsError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_apply_overrides_filters_unrecognized_keys() {
        let mut query = Map::new();
        query.insert("speedScale".to_string(), json!(1.0));

        let mut overrides = Map::new();
        overrides.insert("speedScale".to_string(), json!(1.3));
        overrides.insert("speakerId".to_string(), json!(5));
        overrides.insert("volumeScale".to_string(), json!(0.9));

        apply_overrides(&mut query, &overrides);

        assert_eq!(query.get("speedScale"), Some(&json!(1.3)));
        assert_eq!(query.get("volumeScale"), Some(&json!(0.9)));
        assert!(!query.contains_key("speakerId"));
    }

    #[tokio::test]
    async fn test_synthesize_two_step() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .and(query_param("text", "hello"))
            .and(query_param("speaker", "8"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"speedScale": 1.0, "accentPhrases": []})),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/synthesis"))
            .and(query_param("speaker", "8"))
            .and(body_partial_json(json!({"speedScale": 1.25})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![82u8, 73, 70, 70]))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let mut overrides = Map::new();
        overrides.insert("speedScale".to_string(), json!(1.25));

        let audio = client.synthesize("hello", 8, Some(&overrides)).await.unwrap();
        assert_eq!(audio, vec![82u8, 73, 70, 70]);
    }

    #[tokio::test]
    async fn test_engine_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad speaker"))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let result = client.audio_query("hello", 999).await;

        match result {
            Err(TtsError::Status { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "bad speaker");
            }
            other => panic!("expected status error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_non_object_query_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.audio_query("hello", 1).await,
            Err(TtsError::InvalidResponse(_))
        ));
    }
}
