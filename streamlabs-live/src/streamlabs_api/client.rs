use crate::streamlabs_api::categories::{
    CategorySearchResponse, CategorySuggestion, truncate_query,
};
use crate::streamlabs_api::error::{ClientError, summarize_error_body};
use crate::streamlabs_api::info::{AccountInfo, InfoResponse};
use crate::streamlabs_api::retry::{RetryPolicy, parse_retry_after, retry_idempotent};
use crate::streamlabs_api::stream::{
    AudienceType, EndStreamResponse, StartStreamResponse, StreamCredentials, StreamIdentifier,
};
use reqwest::{Method, Url};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::multipart::Form;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

/// Base URL of the Streamlabs TikTok relay API.
pub const STREAMLABS_API_BASE_URL: &str = "https://streamlabs.com/api/v5/slobs/tiktok";

/// User agent of the Streamlabs Desktop build the relay expects to talk to.
pub const STREAMLABS_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) StreamlabsDesktop/1.17.0 \
    Chrome/122.0.6261.156 Electron/29.3.1 Safari/537.36";

/// Platform reported when starting a stream.
const DEVICE_PLATFORM: &str = "win32";

const INFO_PATH: &[&str] = &["info"];
const START_PATH: &[&str] = &["stream", "start"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClientDefaults;

impl ClientDefaults {
    /// Per-attempt timeout for everything except starting a stream.
    pub const TIMEOUT: Duration = Duration::from_secs(10);
    /// Starting a stream provisions ingest on the relay side and is noticeably slower.
    pub const START_TIMEOUT: Duration = Duration::from_secs(15);
}

/// Transport configuration bound to a [`SessionClient`] at construction.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub start_timeout: Duration,
    /// Applied to idempotent requests only (info and search).
    pub retry_policy: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: STREAMLABS_API_BASE_URL.to_string(),
            user_agent: STREAMLABS_USER_AGENT.to_string(),
            timeout: ClientDefaults::TIMEOUT,
            start_timeout: ClientDefaults::START_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Authenticated session against the Streamlabs TikTok relay.
///
/// The client owns one bearer token and one connection pool. Every public operation converts
/// failures into a documented "soft" value (`None`, a fallback list, `false`) and reports the
/// details through `tracing`, so callers never have to handle transport errors themselves.
///
/// Reads ([`info`](Self::info), [`search`](Self::search)) take `&self` and may run concurrently.
/// [`start`](Self::start) and [`end`](Self::end) take `&mut self` because they share the held
/// [`StreamIdentifier`]; this keeps a start and an end on the same session from interleaving.
#[derive(Debug)]
pub struct SessionClient {
    credential: SecretString,
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    start_timeout: Duration,
    retry_policy: RetryPolicy,
    /// Identifier of the most recently started stream. Never cleared by `end`.
    stream_id: Option<StreamIdentifier>,
}

impl SessionClient {
    /// Creates a client for the production relay with default timeouts and retry policy.
    pub fn new(credential: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(credential, ClientOptions::default())
    }

    /// Creates a client with explicit transport configuration.
    ///
    /// The `authorization` header is attached to the pool's default headers and marked
    /// sensitive, so it never shows up in `Debug` output of requests.
    pub fn with_options(
        credential: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let credential = SecretString::from(credential.into());

        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", credential.expose_secret()))
                .map_err(|e| ClientError::Build(Box::new(e)))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let base_url = Url::parse(options.base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::Build(Box::new(e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Build(
                format!("base URL {base_url} cannot hold a path").into(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(options.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Build(Box::new(e)))?;

        Ok(Self {
            credential,
            client,
            base_url,
            timeout: options.timeout,
            start_timeout: options.start_timeout,
            retry_policy: options.retry_policy,
            stream_id: None,
        })
    }

    /// Whether this session was built from `token`.
    ///
    /// Lets callers keep a session alive while the configured token is unchanged.
    pub fn uses_credential(&self, token: &str) -> bool {
        self.credential.expose_secret() == token
    }

    /// Identifier of the most recently started stream, if any.
    pub fn stream_id(&self) -> Option<&StreamIdentifier> {
        self.stream_id.as_ref()
    }

    /// Fetches the account's identity and LIVE eligibility.
    ///
    /// Returns `None` on any failure. `None` means "unknown", not "cannot go live".
    pub async fn info(&self) -> Option<AccountInfo> {
        match self.try_info().await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(error = %e, status = ?e.status(), "fetch account info failed");
                None
            }
        }
    }

    /// Like [`Self::info`], but hands back the classified error.
    #[instrument(skip(self), ret, level = tracing::Level::DEBUG)]
    pub async fn try_info(&self) -> Result<AccountInfo, ClientError> {
        let response: InfoResponse = self.get_idempotent(None).await?;
        Ok(response.into())
    }

    /// Searches game categories by name.
    ///
    /// An empty query returns an empty list without touching the network. Otherwise the query is
    /// cut to 25 characters (the relay answers longer ones with a 500) and the results are
    /// returned with the [`CategorySuggestion::fallback`] entry appended. On failure the result
    /// is exactly `[fallback]`, so there is always something to pick.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Vec<CategorySuggestion> {
        if query.is_empty() {
            return Vec::new();
        }

        let query_params = [("category", truncate_query(query))];
        match self
            .get_idempotent::<CategorySearchResponse>(Some(&query_params[..]))
            .await
        {
            Ok(response) => {
                let mut categories = response.categories;
                tracing::debug!(returned_items = categories.len(), "fetched categories");
                categories.push(CategorySuggestion::fallback());
                categories
            }
            Err(e) => {
                tracing::warn!(error = %e, status = ?e.status(), "category search failed");
                vec![CategorySuggestion::fallback()]
            }
        }
    }

    /// Maps a category display name to its `game_mask_id`.
    ///
    /// Only an exact `full_name` match counts. Anything else, including a failed search,
    /// resolves to the fallback's empty id.
    pub async fn resolve_category(&self, name: &str) -> String {
        self.search(name)
            .await
            .into_iter()
            .find(|category| category.full_name == name)
            .map(|category| category.game_mask_id)
            .unwrap_or_default()
    }

    /// Asks the relay to provision a LIVE and returns its ingest details.
    ///
    /// On success the returned stream identifier replaces any previously held one. This request
    /// is never retried automatically: a repeated start may create a second stream. Returns
    /// `None` on any failure, including a response missing `id`, `rtmp` or `key`.
    #[instrument(skip(self))]
    pub async fn start(
        &mut self,
        title: &str,
        category_mask_id: &str,
        audience_type: AudienceType,
    ) -> Option<StreamCredentials> {
        match self.try_start(title, category_mask_id, audience_type).await {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                tracing::error!(error = %e, status = ?e.status(), "start stream failed");
                None
            }
        }
    }

    async fn try_start(
        &mut self,
        title: &str,
        category_mask_id: &str,
        audience_type: AudienceType,
    ) -> Result<StreamCredentials, ClientError> {
        let form = Form::new()
            .text("title", title.to_string())
            .text("device_platform", DEVICE_PLATFORM)
            .text("category", category_mask_id.to_string())
            .text("audience_type", audience_type.as_str());

        let body = self
            .send(Method::POST, START_PATH, None, Some(form), self.start_timeout)
            .await?;
        let response: StartStreamResponse = parse_json(&body)?;

        tracing::info!(stream_id = %response.id, "stream started");
        self.stream_id = Some(response.id);

        Ok(StreamCredentials {
            rtmp_url: response.rtmp,
            stream_key: response.key,
        })
    }

    /// Ends the stream identified by the held [`StreamIdentifier`].
    ///
    /// Returns the relay's `success` flag, or `false` on any failure. Without a held identifier
    /// nothing is sent and `false` is returned. The identifier is kept either way, so a second
    /// call re-sends the same one.
    #[instrument(skip(self), fields(stream_id = ?self.stream_id))]
    pub async fn end(&mut self) -> bool {
        match self.try_end().await {
            Ok(success) => {
                if !success {
                    tracing::warn!("relay refused to end the stream");
                }
                success
            }
            Err(e) => {
                tracing::warn!(error = %e, status = ?e.status(), "end stream failed");
                false
            }
        }
    }

    async fn try_end(&self) -> Result<bool, ClientError> {
        let stream_id = self.stream_id.as_ref().ok_or(ClientError::NoActiveStream)?;
        let body = self
            .send(
                Method::POST,
                &["stream", stream_id.as_str(), "end"],
                None,
                None,
                self.timeout,
            )
            .await?;
        let response: EndStreamResponse = parse_json(&body)?;

        tracing::debug!(success = response.success, "end stream response");
        Ok(response.success)
    }

    /// Sends a GET to `/info` under the retry policy and parses the JSON body.
    async fn get_idempotent<T: DeserializeOwned>(
        &self,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<T, ClientError> {
        retry_idempotent(&self.retry_policy, move |_| async move {
            let body = self
                .send(Method::GET, INFO_PATH, query_params, None, self.timeout)
                .await?;
            parse_json(&body)
        })
        .await
    }

    /// Appends `segments` to the base URL, percent-encoding each one as a single segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // the base URL was checked to accept a path at construction
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Makes one authenticated request and returns the body of a successful response.
    ///
    /// Authorization and user agent come from the pool's defaults. Non-success statuses are
    /// turned into [`ClientError::HttpStatus`] carrying a summary of the body and any
    /// `Retry-After` delay.
    #[instrument(skip(self, form), level = tracing::Level::TRACE)]
    async fn send(
        &self,
        method: Method,
        path: &[&str],
        query_params: Option<&[(&str, &str)]>,
        form: Option<Form>,
        timeout: Duration,
    ) -> Result<String, ClientError> {
        let url = self.endpoint(path);
        let mut request = self.client.request(method, url).timeout(timeout);

        if let Some(params) = query_params {
            request = request.query(params);
        }
        if let Some(form) = form {
            request = request.multipart(form);
        }

        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.map_err(ClientError::Transport)?;

        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status,
                body: summarize_error_body(&body),
                retry_after,
            });
        }

        Ok(body)
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|source| ClientError::MalformedResponse {
        source,
        body: summarize_error_body(body),
    })
}
