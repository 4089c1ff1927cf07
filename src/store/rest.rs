//! HTTPS client for a remote document database account.
//!
//! Every request is signed with the account master key: HMAC-SHA256 over the
//! lower-cased verb, resource type and date plus the resource link, base64
//! encoded and URL-encoded into the `authorization` header.

use super::{
    CollectionAddress, DocumentAddress, DocumentClient, FeedOptions, QueryPage, QuerySpec,
    ResourceResponse,
};
use crate::core::{StoreError, StoreResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::StatusCode;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;
use url::{Url, form_urlencoded};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2018-12-31";
const JSON_CONTENT_TYPE: &str = "application/json";
const QUERY_CONTENT_TYPE: &str = "application/query+json";

const HEADER_CONTINUATION: &str = "x-ms-continuation";
const HEADER_REQUEST_CHARGE: &str = "x-ms-request-charge";
const HEADER_ACTIVITY_ID: &str = "x-ms-activity-id";
const HEADER_RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";

/// Remote document store client over the REST protocol
pub struct RestDocumentClient {
    http: reqwest::Client,
    endpoint: Url,
    key: Vec<u8>,
}

/// One signed request
struct RestRequest {
    method: Method,
    /// Path relative to the account endpoint
    path: String,
    /// `dbs`, `colls`, `docs` or empty for the account itself
    resource_type: &'static str,
    /// Link that the signature covers; the parent link for feed requests
    resource_link: String,
    content_type: &'static str,
    headers: Vec<(&'static str, String)>,
    body: Option<Vec<u8>>,
}

impl RestRequest {
    fn new(
        method: Method,
        path: impl Into<String>,
        resource_type: &'static str,
        resource_link: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            resource_type,
            resource_link: resource_link.into(),
            content_type: JSON_CONTENT_TYPE,
            headers: Vec::new(),
            body: None,
        }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn json_body(mut self, body: &Value) -> StoreResult<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct QueryResponseBody {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

impl RestDocumentClient {
    /// Create a client for the account at `endpoint`.
    ///
    /// `master_key` is the base64 account key; `timeout` bounds each request.
    pub fn new(endpoint: &str, master_key: &str, timeout: Duration) -> StoreResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            StoreError::Configuration(format!("Invalid endpoint '{}': {}", endpoint, e))
        })?;

        let key = STANDARD
            .decode(master_key.trim())
            .map_err(|e| StoreError::Configuration(format!("Master key is not base64: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Value of the `authorization` header for one request
    fn authorization(
        &self,
        method: &Method,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> StoreResult<String> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            method.as_str().to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StoreError::Configuration(format!("Unusable master key: {}", e)))?;
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={}", signature);
        Ok(form_urlencoded::byte_serialize(token.as_bytes()).collect())
    }

    async fn send(&self, request: RestRequest) -> StoreResult<reqwest::Response> {
        let url = self.endpoint.join(&request.path).map_err(|e| {
            StoreError::Configuration(format!("Invalid resource path '{}': {}", request.path, e))
        })?;

        let date = rfc1123_now();
        let authorization = self.authorization(
            &request.method,
            request.resource_type,
            &request.resource_link,
            &date,
        )?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header("authorization", authorization)
            .header("x-ms-date", date.as_str())
            .header("x-ms-version", API_VERSION)
            .header("accept", JSON_CONTENT_TYPE);

        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.header("content-type", request.content_type).body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn send_point(&self, request: RestRequest) -> StoreResult<ResourceResponse> {
        let response = self.send(request).await?;
        let status = convert_status(response.status());
        let request_charge = request_charge(response.headers());
        let activity_id = header_value(response.headers(), HEADER_ACTIVITY_ID);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let resource = if bytes.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&bytes)?)
        };

        Ok(ResourceResponse {
            status,
            resource,
            request_charge,
            activity_id,
        })
    }
}

#[async_trait]
impl DocumentClient for RestDocumentClient {
    async fn open(&self) -> StoreResult<()> {
        let response = self.send(RestRequest::new(Method::GET, "", "", "")).await?;
        debug!(
            endpoint = %self.endpoint,
            activity_id = ?header_value(response.headers(), HEADER_ACTIVITY_ID),
            "document store account reachable"
        );
        Ok(())
    }

    async fn read_database(&self, database: &str) -> StoreResult<ResourceResponse> {
        let link = super::address::database_link(database);
        self.send_point(RestRequest::new(Method::GET, link.clone(), "dbs", link))
            .await
    }

    async fn create_database(&self, database: &str) -> StoreResult<ResourceResponse> {
        let request =
            RestRequest::new(Method::POST, "dbs", "dbs", "").json_body(&json!({ "id": database }))?;
        self.send_point(request).await
    }

    async fn read_collection(
        &self,
        collection: &CollectionAddress,
    ) -> StoreResult<ResourceResponse> {
        let link = collection.link();
        self.send_point(RestRequest::new(Method::GET, link.clone(), "colls", link))
            .await
    }

    async fn create_collection(
        &self,
        collection: &CollectionAddress,
        offer_throughput: u32,
    ) -> StoreResult<ResourceResponse> {
        let database_link = collection.database_link();
        let request = RestRequest::new(
            Method::POST,
            format!("{}/colls", database_link),
            "colls",
            database_link,
        )
        .header("x-ms-offer-throughput", offer_throughput.to_string())
        .json_body(&json!({ "id": collection.collection() }))?;
        self.send_point(request).await
    }

    async fn read_document(&self, address: &DocumentAddress) -> StoreResult<ResourceResponse> {
        let link = address.link();
        self.send_point(RestRequest::new(Method::GET, link.clone(), "docs", link))
            .await
    }

    async fn create_document(
        &self,
        collection: &CollectionAddress,
        document: Value,
    ) -> StoreResult<ResourceResponse> {
        let link = collection.link();
        let request = RestRequest::new(Method::POST, format!("{}/docs", link), "docs", link)
            .json_body(&document)?;
        self.send_point(request).await
    }

    async fn replace_document(
        &self,
        address: &DocumentAddress,
        document: Value,
    ) -> StoreResult<ResourceResponse> {
        let link = address.link();
        let request =
            RestRequest::new(Method::PUT, link.clone(), "docs", link).json_body(&document)?;
        self.send_point(request).await
    }

    async fn delete_document(&self, address: &DocumentAddress) -> StoreResult<ResourceResponse> {
        let link = address.link();
        self.send_point(RestRequest::new(Method::DELETE, link.clone(), "docs", link))
            .await
    }

    async fn query_documents(
        &self,
        collection: &CollectionAddress,
        query: &QuerySpec,
        options: &FeedOptions,
    ) -> StoreResult<QueryPage> {
        let link = collection.link();
        let mut request = RestRequest::new(Method::POST, format!("{}/docs", link), "docs", link)
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-documentdb-query-enablecrosspartition", "True");
        request.content_type = QUERY_CONTENT_TYPE;
        request.body = Some(serde_json::to_vec(&query.to_sql())?);

        if let Some(max_item_count) = options.max_item_count {
            request = request.header("x-ms-max-item-count", max_item_count.to_string());
        }
        if let Some(continuation) = &options.continuation {
            request = request.header(HEADER_CONTINUATION, continuation.clone());
        }

        let response = self.send(request).await?;
        let continuation = header_value(response.headers(), HEADER_CONTINUATION);
        let request_charge = request_charge(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        parse_query_page(&bytes, continuation, request_charge)
    }
}

/// Decodes one page of a query feed; a malformed body is a serialization fault
fn parse_query_page(
    bytes: &[u8],
    continuation: Option<String>,
    request_charge: Option<f64>,
) -> StoreResult<QueryPage> {
    let body: QueryResponseBody = serde_json::from_slice(bytes)?;
    Ok(QueryPage {
        documents: body.documents,
        continuation,
        request_charge,
    })
}

async fn error_from_response(response: reqwest::Response) -> StoreError {
    let status = convert_status(response.status());
    let retry_after = header_value(response.headers(), HEADER_RETRY_AFTER_MS)
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis);

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<RemoteErrorBody>(&body) {
        Ok(parsed) if parsed.code.is_empty() => parsed.message,
        Ok(parsed) => format!("{}: {}", parsed.code, parsed.message),
        Err(_) => body,
    };

    let error = StoreError::remote(status, message);
    match retry_after {
        Some(delay) => error.with_retry_after(delay),
        None => error,
    }
}

fn convert_status(status: reqwest::StatusCode) -> StatusCode {
    StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn request_charge(headers: &HeaderMap) -> Option<f64> {
    header_value(headers, HEADER_REQUEST_CHARGE).and_then(|value| value.parse().ok())
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
