use reqwest::multipart;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::ClientError;

/// HTTP transport shared by all stores: one cookie-jar client over a fixed
/// base URL. Login and signup set the session cookie; every later call
/// replays it. That cookie is the whole of the authentication transport.
///
/// No per-request timeout is set; callers live with the transport defaults
/// and requests are not cancellable once issued.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// `base_url` is the `/api` root, e.g. `http://localhost:4000/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        // A trailing slash keeps Url::join from dropping the last segment.
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        let http = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(ApiClient { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.get(url).send().await?;
        Self::into_envelope(response).await
    }

    /// GET without the envelope check, for endpoints that answer with a bare
    /// JSON array (the blog list does).
    pub async fn get_raw(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.get(url).send().await?;
        Self::into_value(response).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.post(url).json(body).send().await?;
        Self::into_envelope(response).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.post(url).send().await?;
        Self::into_envelope(response).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.post(url).multipart(form).send().await?;
        Self::into_envelope(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.endpoint(path)?;
        let response = self.http.delete(url).send().await?;
        Self::into_envelope(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Reads the body as JSON (an unparseable body becomes `null`) and
    /// enforces the `{success, message}` envelope: non-2xx status or an
    /// explicit `success: false` turns into [`ClientError::Api`] carrying
    /// the best message available.
    async fn into_envelope(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body = Self::read_value(response).await?;

        if !status.is_success() {
            return Err(ClientError::api(Self::failure_message(&body, || {
                format!("Request failed with status {}", status)
            })));
        }

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ClientError::api(Self::failure_message(&body, || {
                "Request was not successful".to_string()
            })));
        }

        Ok(body)
    }

    /// Like [`Self::into_envelope`] but only the status gates success.
    async fn into_value(response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let body = Self::read_value(response).await?;

        if !status.is_success() {
            return Err(ClientError::api(Self::failure_message(&body, || {
                format!("Request failed with status {}", status)
            })));
        }
        Ok(body)
    }

    async fn read_value(response: reqwest::Response) -> Result<Value, ClientError> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn failure_message(body: &Value, fallback: impl FnOnce() -> String) -> String {
        body.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(fallback)
    }
}
