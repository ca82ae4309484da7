use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::auth::IdentityProvider;
use crate::config::ConsoleConfig;
use crate::error::{Error, Result};

pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
    Multipart(reqwest::multipart::Form),
}

pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    pub headers: HeaderMap,
    /// Attach a bearer token for the current principal. Defaults to `true`.
    pub requires_auth: bool,
    /// Decode the response body as JSON. Defaults to `true`.
    pub parse_json: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: HeaderMap::new(),
            requires_auth: true,
            parse_json: true,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    #[must_use]
    pub fn discard_body(mut self) -> Self {
        self.parse_json = false;
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    identity: Arc<dyn IdentityProvider>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
        })
    }

    pub fn from_config(config: &ConsoleConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        Self::new(&config.api_base_url, config.request_timeout, identity)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base.
    #[must_use]
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Performs one request. `Ok(None)` when the caller opted out of JSON
    /// decoding or the server answered 204.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        let RequestOptions {
            method,
            body,
            mut headers,
            requires_auth,
            parse_json,
        } = options;

        if requires_auth {
            let principal = self
                .identity
                .current_principal()
                .ok_or(Error::AuthenticationRequired)?;
            let token = self.identity.fresh_token(&principal).await?;
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| Error::Validation("bearer token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let url = self.build_url(path);
        let mut builder = self.client.request(method.clone(), &url);
        match body {
            Some(RequestBody::Json(value)) => {
                set_json_content_type(&mut headers);
                builder = builder.body(serde_json::to_vec(&value)?);
            }
            Some(RequestBody::Text(text)) => {
                set_json_content_type(&mut headers);
                builder = builder.body(text);
            }
            Some(RequestBody::Multipart(form)) => {
                builder = builder.multipart(form);
            }
            None => {}
        }

        tracing::debug!(%method, %url, "api request");
        let response = builder.headers(headers).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.is_empty() {
                format!("Request failed with status {}", status.as_u16())
            } else {
                text
            };
            tracing::debug!(%url, status = status.as_u16(), "api request failed");
            return Err(Error::Transport {
                status: status.as_u16(),
                message,
            });
        }

        if !parse_json || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Like [`request`](Self::request), but a missing body is an error.
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T> {
        self.request(path, options).await?.ok_or(Error::EmptyResponse)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.fetch(path, RequestOptions::get()).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.fetch(path, RequestOptions::post().json(body)?).await
    }
}

fn set_json_content_type(headers: &mut HeaderMap) {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
}
