use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::prelude::*;

// Import domain models and pure functions from core crate
use onenote_md_core::graph::{
    group_section_groups_url, group_sections_url, notebook_section_groups_url,
    notebook_sections_url, notebooks_url, page_content_url, section_pages_url,
    transform_notebooks, transform_pages, transform_section_groups, transform_sections,
    GraphCollection, NotebookResponse, PageResponse, SectionGroupResponse, SectionResponse,
};
pub use onenote_md_core::graph::{Notebook, Page, Section, GRAPH_API_BASE};
use onenote_md_core::retry::{classify_status, parse_retry_after, RetryPolicy, StatusClass};

/// Delay before every request, keeps long exports under the service rate limits
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Microsoft Graph connection settings
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub base_url: String,
    pub token: String,
    pub request_delay: Duration,
    pub retry: RetryPolicy,
}

impl GraphConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: GRAPH_API_BASE.to_string(),
            token: token.into(),
            request_delay: DEFAULT_REQUEST_DELAY,
            retry: RetryPolicy::default(),
        }
    }

    /// Apply CLI overrides to the configuration
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        request_delay_ms: Option<u64>,
        max_retries: Option<u32>,
    ) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(ms) = request_delay_ms {
            self.request_delay = Duration::from_millis(ms);
        }
        if let Some(retries) = max_retries {
            self.retry.max_retries = retries;
        }
        self
    }
}

/// Create an HTTP client sending the bearer token with every request
pub fn create_graph_client(token: &str) -> std::result::Result<reqwest::Client, Error> {
    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
        .map_err(|e| Error::Auth(format!("access token is not a valid header value: {e}")))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
}

/// Source of notebooks, sections, pages and their content
#[async_trait]
pub trait NoteSource: Send + Sync {
    async fn list_notebooks(&self) -> Result<Vec<Notebook>, Error>;

    /// Sections of a notebook, including those nested in section groups
    async fn list_sections(&self, notebook: &Notebook) -> Result<Vec<Section>, Error>;

    async fn list_pages(&self, section: &Section) -> Result<Vec<Page>, Error>;

    async fn fetch_content(&self, page: &Page) -> Result<String, Error>;

    async fn fetch_resource(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// Fill a notebook with its sections and their pages
pub async fn load_notebook<S: NoteSource + ?Sized>(
    source: &S,
    notebook: &Notebook,
) -> Result<Notebook, Error> {
    let mut loaded = notebook.clone();
    loaded.sections = source.list_sections(notebook).await?;
    for section in loaded.sections.iter_mut() {
        section.pages = source.list_pages(section).await?;
    }
    Ok(loaded)
}

/// Whether `url` points at the same scheme, host and port as `base`
pub fn same_host(base: &str, url: &str) -> bool {
    match (reqwest::Url::parse(base), reqwest::Url::parse(url)) {
        (Ok(base), Ok(url)) => {
            base.scheme() == url.scheme()
                && base.host_str() == url.host_str()
                && base.port_or_known_default() == url.port_or_known_default()
        }
        _ => false,
    }
}

/// Authenticated Microsoft Graph OneNote client
pub struct GraphClient {
    /// Carries the bearer token, only used for the Graph host
    client: reqwest::Client,
    /// No credentials, for resources hosted elsewhere
    public: reqwest::Client,
    config: GraphConfig,
}

impl GraphClient {
    fn new(config: GraphConfig) -> Result<Self, Error> {
        let client = create_graph_client(&config.token)?;
        let public = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            public,
            config,
        })
    }

    /// Build a client for `config.token` and check the token with one cheap request.
    ///
    /// Fails with [`Error::Auth`] when the token is empty, invalid or expired.
    pub async fn authenticate(config: GraphConfig) -> Result<Self, Error> {
        if config.token.trim().is_empty() {
            return Err(Error::Auth("the access token is empty".to_string()));
        }

        let graph = Self::new(config)?;

        let check_url = format!(
            "{}?$top=1&$select=id",
            notebooks_url(&graph.config.base_url)
        );
        graph.send(&check_url).await.map_err(|e| match e {
            Error::InvalidUrl(url) => Error::Config(format!("invalid Graph API base URL: {url}")),
            other => other,
        })?;
        log::debug!("Access token accepted by {}", graph.config.base_url);

        Ok(graph)
    }

    /// GET `url`, retrying transient failures according to the retry policy.
    ///
    /// The bearer token is only sent when `url` is on the Graph API host.
    async fn send(&self, url: &str) -> Result<reqwest::Response, Error> {
        let client = if same_host(&self.config.base_url, url) {
            &self.client
        } else {
            &self.public
        };

        let mut attempt = 0;
        loop {
            tokio::time::sleep(self.config.request_delay).await;
            log::debug!("GET {url}");

            let (error, retry_after) = match client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    match classify_status(status) {
                        StatusClass::Success => return Ok(response),
                        StatusClass::Transient => {
                            let retry_after = response
                                .headers()
                                .get(reqwest::header::RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .and_then(parse_retry_after);
                            (
                                Error::TransientNetwork(format!("HTTP {status} from {url}")),
                                retry_after,
                            )
                        }
                        class => return Err(error_for_status(class, status, url, response).await),
                    }
                }
                Err(e) if e.is_builder() => return Err(Error::InvalidUrl(format!("{url}: {e}"))),
                Err(e) => (Error::TransientNetwork(format!("{url}: {e}")), None),
            };

            if !self.config.retry.should_retry(attempt) {
                return Err(error);
            }

            let delay = self.config.retry.delay_for(attempt, retry_after);
            log::warn!(
                "{error}; retrying in {}s (attempt {}/{})",
                delay.as_secs_f32(),
                attempt + 1,
                self.config.retry.max_retries
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, Error> {
        self.send(url)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::Decode(format!("{url}: {e}")))
    }

    /// Gather every item of a paginated collection
    async fn get_collection<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(url) = next {
            let page: GraphCollection<T> = self.get_json(&url).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }
}

async fn error_for_status(
    class: StatusClass,
    status: u16,
    url: &str,
    response: reqwest::Response,
) -> Error {
    let body = response.text().await.unwrap_or_default();
    match class {
        StatusClass::Unauthorized => Error::Auth(format!("HTTP 401 from {url}")),
        StatusClass::Forbidden => Error::AccessDenied(format!(
            "{url} (the section may be password protected)"
        )),
        StatusClass::NotFound => Error::NotFound(url.to_string()),
        _ => Error::Api { status, body },
    }
}

#[async_trait]
impl NoteSource for GraphClient {
    async fn list_notebooks(&self) -> Result<Vec<Notebook>, Error> {
        let url = notebooks_url(&self.config.base_url);
        let notebooks: Vec<NotebookResponse> = self.get_collection(&url).await?;
        Ok(transform_notebooks(notebooks))
    }

    async fn list_sections(&self, notebook: &Notebook) -> Result<Vec<Section>, Error> {
        let base = &self.config.base_url;

        let top: Vec<SectionResponse> = self
            .get_collection(&notebook_sections_url(base, &notebook.id))
            .await?;
        let mut sections = transform_sections(top, &[]);

        let groups: Vec<SectionGroupResponse> = self
            .get_collection(&notebook_section_groups_url(base, &notebook.id))
            .await?;
        let mut pending = transform_section_groups(groups, &[]);

        // Depth first, keeping the listing order of each level
        pending.reverse();
        while let Some(group) = pending.pop() {
            let nested: Vec<SectionResponse> = self
                .get_collection(&group_sections_url(base, &group.id))
                .await?;
            sections.extend(transform_sections(nested, &group.group_path));

            let children: Vec<SectionGroupResponse> = self
                .get_collection(&group_section_groups_url(base, &group.id))
                .await?;
            let mut children = transform_section_groups(children, &group.group_path);
            children.reverse();
            pending.extend(children);
        }

        Ok(sections)
    }

    async fn list_pages(&self, section: &Section) -> Result<Vec<Page>, Error> {
        let url = section_pages_url(&self.config.base_url, &section.id);
        let pages: Vec<PageResponse> = self.get_collection(&url).await?;
        Ok(transform_pages(pages))
    }

    async fn fetch_content(&self, page: &Page) -> Result<String, Error> {
        let url = page_content_url(&self.config.base_url, &page.id);
        self.send(&url)
            .await?
            .text()
            .await
            .map_err(|e| Error::TransientNetwork(format!("{url}: {e}")))
    }

    async fn fetch_resource(&self, url: &str) -> Result<Vec<u8>, Error> {
        let downloadable = reqwest::Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !downloadable {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        let bytes = self
            .send(url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::TransientNetwork(format!("{url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}
