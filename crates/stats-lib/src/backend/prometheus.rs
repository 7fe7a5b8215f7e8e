//! Prometheus HTTP API client

use super::{Metric, MetricsBackend, Sample, Vector};
use crate::error::BackendError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const QUERY_PATH: &str = "api/v1/query";

/// Client for the Prometheus instant query endpoint
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    query_url: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    metric: Metric,
    value: (f64, String),
}

impl PrometheusClient {
    /// Create a client for the Prometheus server at `base_url`.
    ///
    /// # Errors
    ///
    /// Fails if the URL cannot be parsed or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let invalid = |reason: String| BackendError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        // Url::join drops the last path segment unless the base ends in '/'
        let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let query_url = base.join(QUERY_PATH).map_err(|e| invalid(e.to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| BackendError::Request { source })?;

        Ok(Self { client, query_url })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn query(&self, query: &str, at: DateTime<Utc>) -> Result<Vector, BackendError> {
        debug!(query = %query, "Query request");

        let time = format!("{:.3}", at.timestamp_millis() as f64 / 1000.0);
        let response = self
            .client
            .get(self.query_url.clone())
            .query(&[("query", query), ("time", time.as_str())])
            .send()
            .await
            .map_err(|source| BackendError::Request { source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| BackendError::Request { source })?;

        let vector = decode_response(status.as_u16(), &body)?;
        debug!(query = %query, samples = vector.len(), "Query response");
        Ok(vector)
    }
}

/// Decode a Prometheus query API response body into a vector
fn decode_response(status: u16, body: &str) -> Result<Vector, BackendError> {
    // Error responses still carry the JSON envelope when Prometheus produced them
    let parsed: QueryResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) if (200..300).contains(&status) => return Err(BackendError::Decode(e.to_string())),
        Err(_) => {
            return Err(BackendError::Status {
                status,
                body: body.to_string(),
            })
        }
    };

    if parsed.status != "success" {
        return Err(BackendError::Api {
            error_type: parsed.error_type.unwrap_or_else(|| "unknown".to_string()),
            error: parsed.error.unwrap_or_default(),
        });
    }
    if !(200..300).contains(&status) {
        return Err(BackendError::Status {
            status,
            body: body.to_string(),
        });
    }

    let data = parsed
        .data
        .ok_or_else(|| BackendError::Decode("response has no data".to_string()))?;
    if data.result_type != "vector" {
        return Err(BackendError::UnexpectedResultType(data.result_type));
    }

    let samples: Vec<VectorSample> =
        serde_json::from_value(data.result).map_err(|e| BackendError::Decode(e.to_string()))?;

    samples
        .into_iter()
        .map(|s| {
            Ok(Sample {
                metric: s.metric,
                value: parse_sample_value(&s.value.1)?,
                timestamp: s.value.0,
            })
        })
        .collect()
}

/// Parse a sample value in Prometheus text form, including `NaN` and `±Inf`
pub fn parse_sample_value(raw: &str) -> Result<f64, BackendError> {
    match raw {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|_| BackendError::InvalidSample(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const VECTOR_BODY: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "vector",
            "result": [
                {"metric": {"namespace": "ns1", "deployment": "web-a", "classification": "success"}, "value": [1700000000.5, "10"]},
                {"metric": {"namespace": "ns1", "deployment": "web-a", "classification": "failure"}, "value": [1700000000.5, "NaN"]}
            ]
        }
    }"#;

    #[test]
    fn test_parse_sample_value_special_forms() {
        assert!(parse_sample_value("NaN").unwrap().is_nan());
        assert_eq!(parse_sample_value("+Inf").unwrap(), f64::INFINITY);
        assert_eq!(parse_sample_value("-Inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_sample_value("2.5").unwrap(), 2.5);
        assert!(parse_sample_value("ten").is_err());
    }

    #[test]
    fn test_decode_vector_response() {
        let vector = decode_response(200, VECTOR_BODY).unwrap();
        assert_eq!(vector.len(), 2);
        assert_eq!(vector[0].metric["deployment"], "web-a");
        assert_eq!(vector[0].value, 10.0);
        assert!(vector[1].value.is_nan());
    }

    #[test]
    fn test_decode_rejects_non_vector_results() {
        let body = r#"{"status":"success","data":{"resultType":"scalar","result":[1700000000,"1"]}}"#;
        let err = decode_response(200, body).unwrap_err();
        assert!(matches!(err, BackendError::UnexpectedResultType(t) if t == "scalar"));

        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;
        assert!(matches!(
            decode_response(200, body),
            Err(BackendError::UnexpectedResultType(_))
        ));
    }

    #[test]
    fn test_decode_api_error() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#;
        let err = decode_response(400, body).unwrap_err();
        assert!(matches!(err, BackendError::Api { error_type, .. } if error_type == "bad_data"));
    }

    #[test]
    fn test_decode_non_json_failure() {
        let err = decode_response(502, "bad gateway").unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 502, .. }));
    }

    #[test]
    fn test_query_url_keeps_base_path() {
        let client =
            PrometheusClient::new("http://prometheus:9090/prom", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.query_url().as_str(),
            "http://prometheus:9090/prom/api/v1/query"
        );
        assert!(PrometheusClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_query_against_http_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "up".into()),
                Matcher::Regex("time=".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(VECTOR_BODY)
            .create_async()
            .await;

        let client = PrometheusClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let vector = client.query("up", Utc::now()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(vector.len(), 2);
    }
}
