use crate::error::InvokeError;
use crate::http;
use async_trait::async_trait;
use codehealth_config::Config;
use reqwest::{Client, Response};
use serde_json::Value;
use std::future::Future;

pub type QueryParams = Vec<(String, String)>;

/// Builds query parameters from string-ish pairs.
pub fn params<K, V, I>(pairs: I) -> QueryParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: ToString,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.to_string()))
        .collect()
}

#[async_trait]
pub trait ApiQuerier: Send + Sync {
    /// Fetches every page of `endpoint` and returns the records found under `key`, in page order.
    async fn query_list(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        key: &str,
    ) -> Result<Vec<Value>, InvokeError>;
}

/// The CodeScene REST API, cloud or on-prem.
#[derive(Debug, Clone)]
pub struct CodeSceneApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl CodeSceneApi {
    pub fn new(config: &Config) -> Result<Self, InvokeError> {
        let client = http::build_client(config).map_err(InvokeError::from_transport)?;
        Ok(Self::with_client(client, config.api_url(), config.access_token.clone()))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn get_page(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, InvokeError> {
        let url = self.url_for(endpoint);
        log::debug!("GET {url} {params:?}");
        let mut request = self.client.get(&url).query(params);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(InvokeError::from_transport)?;
        read_json(response).await
    }
}

#[async_trait]
impl ApiQuerier for CodeSceneApi {
    async fn query_list(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        key: &str,
    ) -> Result<Vec<Value>, InvokeError> {
        paginate(params, key, |page_params| async move {
            self.get_page(endpoint, &page_params).await
        })
        .await
        .inspect_err(|err| log::warn!("query {endpoint} failed: {err}"))
    }
}

/// Decodes a 2xx JSON body; anything else becomes `ApiFailure` with the body attached.
pub(crate) async fn read_json(response: Response) -> Result<Value, InvokeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InvokeError::api_failure(Some(status.as_u16()), body));
    }
    let body = response.text().await.map_err(InvokeError::from_transport)?;
    serde_json::from_str(&body).map_err(|err| {
        InvokeError::api_failure(Some(status.as_u16()), format!("invalid JSON ({err}): {body}"))
    })
}

/// Drives the `page`/`max_pages` protocol over `fetch_page`.
///
/// The first request uses `params` as given. While the response reports `max_pages` greater than
/// the current page, the next page is requested. Any failure discards what was collected so far.
pub async fn paginate<F, Fut>(
    params: &[(String, String)],
    key: &str,
    mut fetch_page: F,
) -> Result<Vec<Value>, InvokeError>
where
    F: FnMut(QueryParams) -> Fut,
    Fut: Future<Output = Result<Value, InvokeError>>,
{
    let mut page_params = params.to_vec();
    let mut current = requested_page(params);
    let mut records = Vec::new();

    loop {
        let data = fetch_page(page_params.clone()).await?;
        records.extend(records_under(&data, key)?);

        let max_pages = data.get("max_pages").and_then(Value::as_u64).unwrap_or(0);
        let reported = data.get("page").and_then(Value::as_u64).unwrap_or(current);
        current = current.max(reported);
        if max_pages <= current {
            return Ok(records);
        }

        current += 1;
        set_page(&mut page_params, current);
    }
}

fn requested_page(params: &[(String, String)]) -> u64 {
    params
        .iter()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

fn set_page(params: &mut QueryParams, page: u64) {
    match params.iter_mut().find(|(key, _)| key == "page") {
        Some((_, value)) => *value = page.to_string(),
        None => params.push(("page".to_string(), page.to_string())),
    }
}

fn records_under(data: &Value, key: &str) -> Result<Vec<Value>, InvokeError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(InvokeError::api_failure(
            None,
            format!("expected an array under '{key}', got {other}"),
        )),
    }
}
