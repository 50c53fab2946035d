//! Ask Poll: `GET /api/v1/dubo/query/retrieve?dispatch_id=<id>`.
//!
//! Fetches the result, or the current status, of a query dispatched earlier.
//! One call sends exactly one request. How often to poll is up to the caller.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::errors::{Error, Result};
use crate::models::{AskDispatchResponse, HttpValidationError};
use crate::transport::{self, QueryParams, RawResponse, RequestDescriptor, Response};

pub const PATH: &str = "/api/v1/dubo/query/retrieve";

/// Typed body of a documented response.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// 200: the dispatch result or its current status.
    Success(AskDispatchResponse),
    /// 422: the server rejected the request parameters.
    ValidationError(HttpValidationError),
}

impl PollOutcome {
    pub fn as_success(&self) -> Option<&AskDispatchResponse> {
        match self {
            PollOutcome::Success(resp) => Some(resp),
            PollOutcome::ValidationError(_) => None,
        }
    }

    pub fn as_validation_error(&self) -> Option<&HttpValidationError> {
        match self {
            PollOutcome::ValidationError(err) => Some(err),
            PollOutcome::Success(_) => None,
        }
    }
}

/// `dispatch_id` is sent as given. The server validates it and answers 422
/// when it is malformed.
pub fn build_request(dispatch_id: &str) -> RequestDescriptor {
    let params = QueryParams::new().with("dispatch_id", Some(dispatch_id));
    RequestDescriptor::new(Method::GET, PATH, params)
}

fn decode_json(raw: &RawResponse) -> Result<Value> {
    serde_json::from_slice(&raw.content).map_err(|source| Error::Decode {
        status: raw.status,
        source,
    })
}

/// Classify a raw response. Only 200 and 422 bodies are decoded. Any other
/// status is an error when the client raises on unexpected status, and an
/// absent result otherwise.
pub fn parse_response<C: ApiClient + ?Sized>(
    client: &C,
    raw: &RawResponse,
) -> Result<Option<PollOutcome>> {
    let status = raw.status;
    match status {
        StatusCode::OK => {
            let payload = decode_json(raw)?;
            let resp = AskDispatchResponse::from_payload(payload)
                .map_err(|source| Error::Decode { status, source })?;
            Ok(Some(PollOutcome::Success(resp)))
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            let payload = decode_json(raw)?;
            let err = HttpValidationError::from_payload(payload)
                .map_err(|source| Error::Decode { status, source })?;
            Ok(Some(PollOutcome::ValidationError(err)))
        }
        _ if client.raise_on_unexpected_status() => {
            warn!(
                status_code = %status.as_u16(),
                "ask poll: unexpected HTTP status"
            );
            Err(Error::UnexpectedStatus {
                status,
                content: raw.content.clone(),
            })
        }
        _ => {
            debug!(
                status_code = %status.as_u16(),
                "ask poll: undocumented status, no parsed result"
            );
            Ok(None)
        }
    }
}

fn build_response<C: ApiClient + ?Sized>(
    client: &C,
    raw: RawResponse,
) -> Result<Response<PollOutcome>> {
    let parsed = parse_response(client, &raw)?;
    Ok(Response::from_raw(raw, parsed))
}

/// Poll a dispatch and return the full response envelope.
///
/// # Errors
/// [`Error::UnexpectedStatus`] for an undocumented status code when the client
/// has `raise_on_unexpected_status` set, [`Error::Transport`] when the request
/// fails or times out, [`Error::Decode`] when a 200/422 body is not the
/// documented JSON.
pub async fn send_detailed<C: ApiClient + ?Sized>(
    client: &C,
    dispatch_id: &str,
) -> Result<Response<PollOutcome>> {
    let request = build_request(dispatch_id);
    debug!(dispatch_id = %dispatch_id, "ask poll");
    let raw = transport::send(client.http_client()?, client.base_url(), &request).await?;
    build_response(client, raw)
}

/// Like [`send_detailed`] but returns only the parsed outcome.
pub async fn send<C: ApiClient + ?Sized>(
    client: &C,
    dispatch_id: &str,
) -> Result<Option<PollOutcome>> {
    Ok(send_detailed(client, dispatch_id).await?.into_parsed())
}

/// Blocking form of [`send_detailed`]. Do not call from inside an async runtime.
pub fn send_detailed_blocking<C: ApiClient + ?Sized>(
    client: &C,
    dispatch_id: &str,
) -> Result<Response<PollOutcome>> {
    let request = build_request(dispatch_id);
    debug!(dispatch_id = %dispatch_id, "ask poll (blocking)");
    let http = client.blocking_http_client()?;
    let raw = transport::send_blocking(http, client.base_url(), &request)?;
    build_response(client, raw)
}

/// Blocking form of [`send`].
pub fn send_blocking<C: ApiClient + ?Sized>(
    client: &C,
    dispatch_id: &str,
) -> Result<Option<PollOutcome>> {
    Ok(send_detailed_blocking(client, dispatch_id)?.into_parsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use bytes::Bytes;
    use reqwest::header::HeaderMap;
    use serde_json::json;

    fn raw(status: u16, body: &'static str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content: Bytes::from_static(body.as_bytes()),
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn build_request_targets_retrieve_endpoint() {
        let req = build_request("d-123");
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url, "/api/v1/dubo/query/retrieve");
        assert_eq!(
            req.params,
            vec![("dispatch_id".to_string(), "d-123".to_string())]
        );
    }

    #[test]
    fn build_request_does_not_validate_id() {
        let req = build_request("not a uuid / ?&");
        assert_eq!(req.params[0].1, "not a uuid / ?&");
    }

    #[test]
    fn ok_decodes_dispatch_response() {
        let client = Client::new("http://unused");
        let outcome = parse_response(
            &client,
            &raw(200, r#"{"result": "done", "data": [{"n": 1}, {"n": 2}]}"#),
        )
        .unwrap()
        .unwrap();

        let resp = outcome.as_success().expect("success variant");
        assert_eq!(resp.result_str(), Some("done"));
        assert_eq!(resp.data, Some(json!([{"n": 1}, {"n": 2}])));
        assert!(outcome.as_validation_error().is_none());
    }

    #[test]
    fn unprocessable_decodes_validation_error() {
        let client = Client::new("http://unused");
        let outcome = parse_response(
            &client,
            &raw(
                422,
                r#"{"detail": [{"loc": ["query", "dispatch_id"], "msg": "field required", "type": "value_error.missing"}]}"#,
            ),
        )
        .unwrap()
        .unwrap();

        let err = outcome.as_validation_error().expect("validation variant");
        assert_eq!(err.messages(), vec!["field required"]);
    }

    #[test]
    fn unexpected_status_raises_when_configured() {
        let client = Client::new("http://unused").with_raise_on_unexpected_status(true);
        let err = parse_response(&client, &raw(500, "internal error")).unwrap_err();
        match err {
            Error::UnexpectedStatus { status, content } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(&content[..], b"internal error");
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_status_is_absent_by_default() {
        let client = Client::new("http://unused");
        assert!(parse_response(&client, &raw(500, "internal error"))
            .unwrap()
            .is_none());
        // Undocumented codes are never decoded, even with a JSON body.
        assert!(parse_response(&client, &raw(404, r#"{"result": "done"}"#))
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_ok_body_is_decode_error() {
        let client = Client::new("http://unused");
        let err = parse_response(&client, &raw(200, "<html>")).unwrap_err();
        assert!(matches!(err, Error::Decode { status, .. } if status == StatusCode::OK));
    }

    #[test]
    fn build_response_keeps_raw_fields() {
        let client = Client::new("http://unused");
        let mut response = raw(503, "busy");
        response
            .headers
            .insert("retry-after", "5".parse().unwrap());

        let envelope = build_response(&client, response).unwrap();
        assert_eq!(envelope.status_code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&envelope.content[..], b"busy");
        assert_eq!(envelope.headers["retry-after"], "5");
        assert!(envelope.parsed.is_none());
    }
}
