use std::time::Duration;

use crate::{
    foundation::error::TraceError,
    trace::model::{Action, Trace, TraceBundle, TraceRequest, WireAction},
};

/// Default backend address, matching the development server of the algorithm service.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpTraceSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Build a config from `SORTREPLAY_BACKEND_URL` / `SORTREPLAY_TIMEOUT_MS`, falling back to
    /// defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let base_url = std::env::var("SORTREPLAY_BACKEND_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let timeout = std::env::var("SORTREPLAY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { base_url, timeout }
    }

    pub fn endpoint(&self, algorithm: &str) -> String {
        format!(
            "{}/api/algorithm/{}",
            self.base_url.trim_end_matches('/'),
            algorithm
        )
    }
}

/// Anything that can produce a validated trace for an algorithm.
///
/// Implementations must not retry on their own; retry is a caller decision.
pub trait TraceSource {
    fn load_trace(
        &self,
        algorithm: &str,
        request: &TraceRequest,
    ) -> Result<TraceBundle, TraceError>;
}

/// Blocking HTTP client for the algorithm backend.
pub struct HttpTraceSource {
    cfg: ClientConfig,
    client: reqwest::blocking::Client,
}

impl HttpTraceSource {
    pub fn new(cfg: ClientConfig) -> Result<Self, TraceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| TraceError::backend_unavailable(format!("build http client: {e}")))?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }
}

impl TraceSource for HttpTraceSource {
    #[tracing::instrument(skip(self, request), fields(base_url = %self.cfg.base_url))]
    fn load_trace(
        &self,
        algorithm: &str,
        request: &TraceRequest,
    ) -> Result<TraceBundle, TraceError> {
        let algorithm = validate_algorithm_name(algorithm)?;
        let url = self.cfg.endpoint(algorithm);
        tracing::debug!(%url, ?request, "requesting trace");

        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|e| TraceError::backend_unavailable(format!("POST {url}: {e}")))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| TraceError::backend_unavailable(format!("read response body: {e}")))?;

        let mut bundle = decode_response(status, &body).inspect_err(|e| {
            tracing::warn!(status, error = %e, "trace rejected");
        })?;
        if bundle.algorithm.is_none() {
            bundle.algorithm = Some(algorithm.to_string());
        }
        tracing::info!(
            algorithm,
            len = bundle.original.len(),
            actions = bundle.trace.len(),
            "trace loaded"
        );
        Ok(bundle)
    }
}

fn validate_algorithm_name(name: &str) -> Result<&str, TraceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TraceError::invalid_request("algorithm name is empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TraceError::invalid_request(format!(
            "algorithm name '{name}' must be ascii alphanumeric, '-' or '_'"
        )));
    }
    Ok(name)
}

#[derive(serde::Deserialize)]
struct WireResponse {
    #[serde(default)]
    algorithm_name: Option<String>,
    input_array: Vec<f64>,
    // Kept raw so every per-action failure can name its index.
    actions: Vec<serde_json::Value>,
}

/// Validate a backend response body and turn it into a [`TraceBundle`].
///
/// A top-level `error` field rejects the response regardless of `status`. Nothing is coerced:
/// missing or wrong-typed fields fail the whole response.
pub fn decode_response(status: u16, body: &str) -> Result<TraceBundle, TraceError> {
    let success = (200..300).contains(&status);

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) if success => {
            return Err(TraceError::malformed(format!("invalid JSON: {e}")));
        }
        Err(_) => {
            return Err(TraceError::backend_unavailable(format!(
                "status {status}: {}",
                body.trim()
            )));
        }
    };

    if let Some(err) = value.get("error") {
        let mut msg = match err {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if let Some(details) = value.get("details").and_then(|d| d.as_str()) {
            msg.push_str(": ");
            msg.push_str(details);
        }
        return Err(TraceError::backend_unavailable(format!(
            "backend reported error (status {status}): {msg}"
        )));
    }

    if !success {
        return Err(TraceError::backend_unavailable(format!(
            "status {status}: {}",
            body.trim()
        )));
    }

    if !value.is_object() {
        return Err(TraceError::malformed("response body is not a JSON object"));
    }

    let wire: WireResponse =
        serde_json::from_value(value).map_err(|e| TraceError::malformed(e.to_string()))?;

    if wire.input_array.is_empty() {
        return Err(TraceError::malformed("input_array is empty"));
    }

    let actions = wire
        .actions
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let malformed = |e: String| TraceError::malformed(format!("actions[{i}]: {e}"));
            let wire: WireAction =
                serde_json::from_value(raw).map_err(|e| malformed(e.to_string()))?;
            Action::try_from(wire).map_err(malformed)
        })
        .collect::<Result<Trace, _>>()?;

    Ok(TraceBundle {
        algorithm: wire.algorithm_name,
        original: wire.input_array,
        trace: actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_name() {
        let cfg = ClientConfig {
            base_url: "http://localhost:9000/".to_string(),
            timeout: DEFAULT_TIMEOUT,
        };
        assert_eq!(
            cfg.endpoint("merge"),
            "http://localhost:9000/api/algorithm/merge"
        );
    }

    #[test]
    fn algorithm_name_is_checked() {
        assert!(matches!(
            validate_algorithm_name("   "),
            Err(TraceError::InvalidRequest(_))
        ));
        assert!(validate_algorithm_name("../etc").is_err());
        assert_eq!(validate_algorithm_name(" quick ").unwrap(), "quick");
    }

    #[test]
    fn unknown_response_fields_are_ignored() {
        let body = r#"{
            "algorithm_name": "bubble",
            "input_array": [2, 1],
            "size": 2,
            "result": "ok",
            "actions": [{"type": "compare", "positions": [0, 1], "values": [2, 1]}]
        }"#;
        let bundle = decode_response(200, body).unwrap();
        assert_eq!(bundle.algorithm.as_deref(), Some("bubble"));
        assert_eq!(bundle.original, vec![2.0, 1.0]);
        assert_eq!(bundle.trace.actions(), &[Action::Compare(0, 1)]);
    }
}
