use super::connection::{ConnectionString, Credentials, rfc1123_now, shared_key_lite};
use super::protocol::*;
use super::store::TableStore;
use super::types::{Filter, TableEntity, TableError, TableResult};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `TableStore` over the Azure Table Storage REST API.
///
/// Every call is a single HTTP exchange (or a chain of them while following
/// continuation tokens). Failures are returned as-is; there is no retry.
pub struct HttpTableStore {
    http_client: reqwest::Client,
    connection: ConnectionString,
    /// Path component of the endpoint URL, prepended to resource paths when
    /// signing (non-empty for emulator-style endpoints).
    base_path: String,
    timeout: Duration,
}

impl HttpTableStore {
    pub fn new(connection: ConnectionString) -> TableResult<Self> {
        let endpoint = Url::parse(&connection.table_endpoint).map_err(|e| {
            TableError::InvalidConnectionString(format!(
                "bad table endpoint {}: {}",
                connection.table_endpoint, e
            ))
        })?;
        let base_path = endpoint.path().trim_end_matches('/').to_string();

        Ok(Self {
            http_client: reqwest::Client::new(),
            connection,
            base_path,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn from_connection_string(raw: &str) -> TableResult<Self> {
        Self::new(ConnectionString::parse(raw)?)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.connection.table_endpoint
    }

    fn request(&self, method: Method, path: &str) -> TableResult<reqwest::RequestBuilder> {
        let date = rfc1123_now();
        let mut url = format!("{}{}", self.connection.table_endpoint, path);

        let authorization = match &self.connection.credentials {
            Credentials::SharedKey(key) => Some(shared_key_lite(
                &self.connection.account_name,
                key,
                &date,
                &format!("{}{}", self.base_path, path),
            )?),
            Credentials::Sas(sas) => {
                url = format!("{}?{}", url, sas);
                None
            }
        };

        let mut builder = self
            .http_client
            .request(method, url)
            .timeout(self.timeout)
            .header(HEADER_DATE, date)
            .header(HEADER_VERSION, API_VERSION)
            .header(HEADER_DATA_SERVICE_VERSION, "3.0;NetFx")
            .header(ACCEPT, ACCEPT_JSON);

        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        Ok(builder)
    }

    async fn into_error(response: reqwest::Response, table: &str) -> TableError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return TableError::TableNotFound(table.to_string());
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message.value),
            Err(_) => ("Unknown".to_string(), body),
        };

        let already_exists =
            code == ERROR_TABLE_ALREADY_EXISTS || code == ERROR_ENTITY_ALREADY_EXISTS;
        if status == StatusCode::CONFLICT && already_exists {
            return TableError::AlreadyExists;
        }

        TableError::Status {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl TableStore for HttpTableStore {
    async fn create_table(&self, table: &str) -> TableResult<()> {
        let response = self
            .request(Method::POST, ENDPOINT_TABLES)?
            .header(HEADER_PREFER, PREFER_NO_CONTENT)
            .json(&CreateTableRequest {
                table_name: table.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::into_error(response, table).await);
        }
        tracing::info!("Created table {} at {}", table, self.endpoint());
        Ok(())
    }

    async fn insert_entity(&self, table: &str, entity: TableEntity) -> TableResult<()> {
        let response = self
            .request(Method::POST, &entities_path(table))?
            .header(HEADER_PREFER, PREFER_NO_CONTENT)
            .json(&entity.to_json())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::into_error(response, table).await);
        }
        Ok(())
    }

    async fn query_entities(&self, table: &str, filter: &Filter) -> TableResult<Vec<TableEntity>> {
        let mut entities = Vec::new();
        let mut continuation: Option<(String, Option<String>)> = None;

        loop {
            let mut query: Vec<(&str, String)> = Vec::new();
            if !filter.is_empty() {
                query.push((QUERY_FILTER, filter.to_odata()));
            }
            if let Some((next_partition, next_row)) = &continuation {
                query.push((QUERY_NEXT_PARTITION, next_partition.clone()));
                if let Some(next_row) = next_row {
                    query.push((QUERY_NEXT_ROW, next_row.clone()));
                }
            }

            let response = self
                .request(Method::GET, &query_path(table))?
                .query(&query)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::into_error(response, table).await);
            }

            let next_partition = header_value(&response, HEADER_CONTINUATION_PARTITION);
            let next_row = header_value(&response, HEADER_CONTINUATION_ROW);

            let body = response.bytes().await?;
            let page: QueryResponse = serde_json::from_slice(&body)?;
            for raw in &page.value {
                match TableEntity::from_json(raw) {
                    Some(entity) => entities.push(entity),
                    None => tracing::warn!("Skipping entity without keys in table {}", table),
                }
            }

            match next_partition {
                Some(next_partition) => continuation = Some((next_partition, next_row)),
                None => break,
            }
        }

        tracing::debug!(
            "Query on {} ({}) returned {} entities",
            table,
            filter.to_odata(),
            entities.len()
        );
        Ok(entities)
    }
}
