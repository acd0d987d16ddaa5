use std::{str::FromStr, time::Duration};

use bytes::Bytes;
use reqwest::{
    Client, Method, Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};

use crate::{
    endpoint::Endpoint,
    error::{Error, Result},
};

/// Status and fully drained body of one response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of issuing one request: a response, or the transport error that
/// prevented one.
pub type Outcome = Result<HttpResponse>;

/// Issues requests for a single endpoint.
///
/// Everything that can be resolved ahead of time (URL, method, headers, the
/// serialized body, the client and its timeout) is resolved once in
/// [`RequestExecutor::new`]. A malformed descriptor therefore surfaces as a
/// configuration error before any request goes out.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestExecutor {
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        let url = Url::parse(&endpoint.url())
            .map_err(|e| Error::config(format!("invalid url {}: {e}", endpoint.url())))?;
        let method = Method::from_str(&endpoint.method.to_uppercase())
            .map_err(|e| Error::config(format!("invalid method {}: {e}", endpoint.method)))?;

        let mut headers = HeaderMap::with_capacity(endpoint.headers.len());
        for (name, value) in &endpoint.headers {
            let name = HeaderName::from_str(name)
                .map_err(|e| Error::config(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("invalid header value {value}: {e}")))?;
            headers.insert(name, value);
        }

        let body = match &endpoint.body {
            Some(body) => body.to_bytes()?,
            None => Bytes::new(),
        };

        let mut builder = Client::builder();
        if endpoint.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(endpoint.timeout));
        }
        let client = builder
            .build()
            .map_err(|e| Error::config(format!("cannot build http client: {e}")))?;

        Ok(Self {
            client,
            method,
            url,
            headers,
            body,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sends the request and reads the whole body.
    ///
    /// The client timeout spans connect, send and the body read. The response
    /// is consumed by the read, which hands the connection back to the pool
    /// whether or not the read succeeds.
    pub async fn execute(&self) -> Outcome {
        let response = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .body(self.body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}
