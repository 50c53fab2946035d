use tracing::{debug, trace};

use crate::errors::Result;
use crate::transport::{RawResponse, RequestDescriptor};

/// Send a request through the async transport handle and collect the full body.
pub async fn send(
    client: &reqwest::Client,
    base_url: &str,
    request: &RequestDescriptor,
) -> Result<RawResponse> {
    let url = request.full_url(base_url);

    trace!(
        method = %request.method,
        url = %url,
        params = ?request.params,
        "sending request"
    );

    let resp = client
        .request(request.method.clone(), &url)
        .query(&request.params)
        .send()
        .await?;

    let status = resp.status();
    let headers = resp.headers().clone();
    let content = resp.bytes().await?;

    debug!(
        method = %request.method,
        url = %url,
        status_code = %status.as_u16(),
        body_len = content.len(),
        "received response"
    );

    Ok(RawResponse {
        status,
        content,
        headers,
    })
}

/// Blocking counterpart of [`send`]. Must not be called from inside an async runtime.
pub fn send_blocking(
    client: &reqwest::blocking::Client,
    base_url: &str,
    request: &RequestDescriptor,
) -> Result<RawResponse> {
    let url = request.full_url(base_url);

    trace!(
        method = %request.method,
        url = %url,
        params = ?request.params,
        "sending blocking request"
    );

    let resp = client
        .request(request.method.clone(), &url)
        .query(&request.params)
        .send()?;

    let status = resp.status();
    let headers = resp.headers().clone();
    let content = resp.bytes()?;

    debug!(
        method = %request.method,
        url = %url,
        status_code = %status.as_u16(),
        body_len = content.len(),
        "received response"
    );

    Ok(RawResponse {
        status,
        content,
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::transport::QueryParams;
    use mockito::{Matcher, Server};
    use reqwest::Method;

    fn descriptor() -> RequestDescriptor {
        RequestDescriptor::new(
            Method::GET,
            "/api/v1/items",
            QueryParams::new()
                .with("id", Some("it-1"))
                .with("page", None::<u32>),
        )
    }

    #[tokio::test]
    async fn send_passes_query_and_returns_raw_response() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/items")
            .match_query(Matcher::Exact("id=it-1".into()))
            .with_status(418)
            .with_header("x-trace", "t-9")
            .with_body("teapot")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let raw = send(&client, &server.url(), &descriptor())
            .await
            .expect("send should succeed");

        assert_eq!(raw.status.as_u16(), 418);
        assert_eq!(&raw.content[..], b"teapot");
        assert_eq!(raw.headers["x-trace"], "t-9");
        mock.assert_async().await;
    }

    #[test]
    fn send_blocking_passes_query_and_returns_raw_response() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/v1/items")
            .match_query(Matcher::Exact("id=it-1".into()))
            .with_status(200)
            .with_body("{}")
            .create();

        let client = reqwest::blocking::Client::new();
        let raw = send_blocking(&client, &server.url(), &descriptor())
            .expect("send_blocking should succeed");

        assert_eq!(raw.status.as_u16(), 200);
        assert_eq!(&raw.content[..], b"{}");
        mock.assert();
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let client = reqwest::Client::new();
        // Port 9 (discard) is not expected to be listening on loopback.
        let result = send(&client, "http://127.0.0.1:9", &descriptor()).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
