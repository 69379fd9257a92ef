use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;

use super::AuthContext;

/// Thin JSON client for the platform REST API.
///
/// Attaches `Authorization: Bearer <token>` whenever the shared
/// `AuthContext` holds a token, and logs the user out on 401/403.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    auth: AuthContext,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` for a malformed base URL and
    /// `ApiError::Http` if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, auth: AuthContext) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    #[must_use]
    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path (with or without a leading slash) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` for transport failures, non-success statuses or
    /// undecodable bodies.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// # Errors
    ///
    /// Returns `ApiError` for transport failures, non-success statuses or
    /// undecodable bodies.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path)?.json(body);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// POST and ignore the response body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let request = self.request(Method::POST, path)?.json(body);
        self.send(request).await?;
        Ok(())
    }

    /// PATCH and ignore the response body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    pub async fn patch_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let request = self.request(Method::PATCH, path)?.json(body);
        self.send(request).await?;
        Ok(())
    }

    /// POST a multipart form and ignore the response body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<(), ApiError> {
        let request = self.request(Method::POST, path)?.multipart(form);
        self.send(request).await?;
        Ok(())
    }

    /// DELETE with a JSON body and ignore the response body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or non-success statuses.
    pub async fn delete_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path)?.json(body);
        self.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        let request = self.http.request(method, url);
        Ok(match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), %status, "api response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, "api rejected credentials, clearing session token");
            self.auth.clear();
            return Err(ApiError::Unauthorized(status));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus { status, body });
        }

        Ok(response)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    // `Url::join` drops the last path segment unless the base ends in a slash.
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}
