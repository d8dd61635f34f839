use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("http request timed out after {0:?}")]
    Timeout(Duration),

    #[error("http request failed: {0}")]
    Request(#[source] reqwest::Error),
}

/// Coarse classification of a transport failure, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransportErrorKind {
    InvalidUrl,
    Timeout,
    Connect,
    Request,
}

impl Error {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Error::InvalidUrl(_) => TransportErrorKind::InvalidUrl,
            Error::Timeout(_) => TransportErrorKind::Timeout,
            Error::ClientBuild(_) => TransportErrorKind::Request,
            Error::Request(err) if err.is_connect() => TransportErrorKind::Connect,
            Error::Request(_) => TransportErrorKind::Request,
        }
    }

    /// Status code surfaced by the transport before it failed, if any.
    pub fn partial_status(&self) -> Option<u16> {
        match self {
            Error::Request(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: String) -> Self {
        Self {
            method: reqwest::Method::GET,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: String, body: serde_json::Value) -> Self {
        Self {
            method: reqwest::Method::POST,
            url,
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: String) -> Self {
        self.headers.push((name.to_string(), value));
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: bytes::Bytes,
}

impl HttpResponse {
    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Thin wrapper over a pooled reqwest client with a hard per-request timeout.
///
/// A non-2xx status is still an `Ok(HttpResponse)`; only transport-level
/// failures (connect, timeout, protocol) surface as `Err`. The scenario layer
/// maps both arms into a recorded sample.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::ClientBuild)?;

        Ok(Self { inner, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let url =
            reqwest::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = self.inner.request(req.method, url);
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::Request(err)
            }
        })?;

        let status = res.status().as_u16();
        let body = res.bytes().await.map_err(|err| {
            if err.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::Request(err)
            }
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_url_is_classified() {
        let client = match HttpClient::new(Duration::from_secs(1)) {
            Ok(c) => c,
            Err(err) => panic!("client build failed: {err}"),
        };

        let err = match client
            .request(HttpRequest::get("not a url".to_string()))
            .await
        {
            Ok(_) => panic!("expected an error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), TransportErrorKind::InvalidUrl);
    }

    #[test]
    fn post_json_carries_body_and_headers() {
        let req = HttpRequest::post_json(
            "http://localhost/api/orders".to_string(),
            serde_json::json!({"tableId": "t-1"}),
        )
        .with_header("authorization", "Bearer token".to_string());

        assert_eq!(req.method, reqwest::Method::POST);
        assert!(req.body.is_some());
        assert_eq!(req.headers.len(), 1);
    }
}
