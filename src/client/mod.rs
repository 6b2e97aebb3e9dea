//! HTTP client for the library and user services
//!
//! Every request carries the stored bearer token. An unauthorized response
//! triggers one re-authentication with the cached credentials and a single
//! replay of the original request; there is no retry loop.

pub mod library;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    multipart::{Form, Part},
    Method, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::{
    config::ApiConfig,
    error::{ClientError, ClientResult},
    models::ImageUpload,
    session::SessionStore,
};

/// Remote service a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Library,
    User,
}

#[derive(Debug, Clone)]
pub(crate) enum FormField {
    Text(&'static str, String),
    File(&'static str, ImageUpload),
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormField>),
}

/// Replayable description of a request.
///
/// Multipart forms cannot be cloned once built, so the form is rebuilt from
/// this description on each attempt.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    service: Service,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Body,
    authenticated: bool,
}

impl ApiRequest {
    pub(crate) fn new(method: Method, service: Service, path: impl Into<String>) -> Self {
        Self {
            method,
            service,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            authenticated: true,
        }
    }

    pub(crate) fn get(service: Service, path: impl Into<String>) -> Self {
        Self::new(Method::GET, service, path)
    }

    pub(crate) fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub(crate) fn json<T: serde::Serialize>(mut self, body: &T) -> ClientResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Validation(format!("Cannot encode request body: {}", e)))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub(crate) fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = Body::Multipart(fields);
        self
    }

    pub(crate) fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

/// Client for both Bookshelf services, sharing one session store
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    library_url: String,
    user_url: String,
    page_size: u32,
    session: Arc<dyn SessionStore>,
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("bookshelf-client/", env!("CARGO_PKG_VERSION")));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            library_url: config.library_url.trim_end_matches('/').to_string(),
            user_url: config.user_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            session,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Send a request and decode its JSON body
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let response = self.execute(&request).await?;
        decode(response, &request.path).await
    }

    /// Send a request whose response body is not needed
    pub(crate) async fn send(&self, request: ApiRequest) -> ClientResult<()> {
        self.execute(&request).await.map(|_| ())
    }

    async fn execute(&self, request: &ApiRequest) -> ClientResult<Response> {
        let token = if request.authenticated {
            self.session.get().await?
        } else {
            None
        };

        let response = self.send_once(request, token.as_deref()).await?;
        if !request.authenticated || response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        tracing::info!("Token rejected on {} {}, attempting re-login", request.method, request.path);
        let failure = failure_from(response).await;

        match self.refresh_token(token.as_deref()).await {
            Some(new_token) => {
                let retry = self.send_once(request, Some(&new_token)).await?;
                check_status(retry).await
            }
            None => Err(failure),
        }
    }

    async fn send_once(&self, request: &ApiRequest, token: Option<&str>) -> ClientResult<Response> {
        tracing::debug!("{} {} {:?}", request.method, request.path, request.query);
        Ok(self.build(request, token)?.send().await?)
    }

    fn build(&self, request: &ApiRequest, token: Option<&str>) -> ClientResult<RequestBuilder> {
        let base = match request.service {
            Service::Library => &self.library_url,
            Service::User => &self.user_url,
        };

        let mut builder = self
            .http
            .request(request.method.clone(), format!("{}{}", base, request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        Ok(match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(fields) => builder.multipart(build_form(fields)?),
        })
    }

    /// Obtain a new token after `stale` was rejected.
    ///
    /// Serialized so that concurrent 401s produce one login call; callers that
    /// waited on the lock pick up the token the first caller stored.
    async fn refresh_token(&self, stale: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        match self.session.get().await {
            Ok(Some(current)) if Some(current.as_str()) != stale => return Some(current),
            Ok(_) => {}
            Err(e) => tracing::warn!("Cannot read session during refresh: {}", e),
        }

        if let Err(e) = self.session.discard_token().await {
            tracing::warn!("Failed to discard expired token: {}", e);
        }

        let credentials = match self.session.credentials().await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                tracing::debug!("No cached credentials, cannot re-authenticate");
                return None;
            }
            Err(e) => {
                tracing::warn!("Cannot read cached credentials: {}", e);
                return None;
            }
        };

        match self.login(&credentials.username, &credentials.password).await {
            Ok(token) => {
                if let Err(e) = self.session.set_token(&token).await {
                    tracing::warn!("Failed to store refreshed token: {}", e);
                }
                tracing::info!("Re-authenticated as {}", credentials.username);
                Some(token)
            }
            Err(e) => {
                tracing::warn!("Re-authentication failed: {}", e);
                None
            }
        }
    }
}

fn build_form(fields: &[FormField]) -> ClientResult<Form> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text(name, value) => form.text(*name, value.clone()),
            FormField::File(name, upload) => {
                let part = Part::bytes(upload.bytes.clone())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.mime_type)?;
                form.part(*name, part)
            }
        };
    }
    Ok(form)
}

async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> ClientResult<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ClientError::SchemaMismatch(format!("{}: {}", path, e)))
}

async fn check_status(response: Response) -> ClientResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(failure_from(response).await)
    }
}

async fn failure_from(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::RequestFailed { status, body }
}
