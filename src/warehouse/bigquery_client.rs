//! BigQuery REST client
//!
//! One `jobs.query` call per statement. When the job outlives the synchronous
//! wait, `getQueryResults` is polled until it completes, then followed page by
//! page. Nothing is retried; the per-request timeout also bounds the total
//! time spent waiting for a job.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::errors::WarehouseError;
use super::models::{
    ErrorResponse, Job, QueryParameterBody, QueryRequestBody, QueryResponse, Table,
};
use super::{QueryExecutor, QueryOutcome, QueryRequest, TableRef, TabularResult};
use crate::config::WarehouseConfig;
use crate::feature_catalog::ColumnInfo;

pub struct BigQueryClient {
    http: Client,
    config: WarehouseConfig,
    access_token: String,
}

impl BigQueryClient {
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if config.project_id.trim().is_empty() {
            return Err(WarehouseError::Configuration(
                "BigQuery project id is not set".to_string(),
            ));
        }
        let access_token = config
            .access_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                WarehouseError::Configuration(
                    "BIGQUERY_ACCESS_TOKEN is not set".to_string(),
                )
            })?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WarehouseError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            config,
            access_token,
        })
    }

    fn project_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project_id,
            path
        )
    }

    /// Send an authorised request and decode the JSON body; API errors keep
    /// the server's message.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, String> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("BigQuery API error ({}): {}", status, message));
        }

        response
            .json()
            .await
            .map_err(|e| format!("failed to parse BigQuery response: {}", e))
    }

    fn request_body(&self, request: &QueryRequest) -> QueryRequestBody {
        QueryRequestBody {
            query: request.sql.clone(),
            use_legacy_sql: false,
            use_query_cache: self.config.use_query_cache,
            dry_run: request.dry_run,
            parameter_mode: "NAMED".to_string(),
            query_parameters: request
                .parameters
                .iter()
                .map(|p| QueryParameterBody::string_array(&p.name, &p.values))
                .collect(),
            request_id: uuid::Uuid::new_v4().to_string(),
            timeout_ms: self.config.timeout_ms,
            location: self.config.location.clone(),
        }
    }

    async fn query_results(
        &self,
        job_id: &str,
        location: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, WarehouseError> {
        let mut params = vec![("timeoutMs", self.config.timeout_ms.to_string())];
        if let Some(location) = location {
            params.push(("location", location.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let request = self
            .http
            .get(self.project_url(&format!("queries/{}", job_id)))
            .query(&params);
        self.send_json(request)
            .await
            .map_err(WarehouseError::QueryMaterializationFailure)
    }

    /// Elapsed time from `jobs.get`; missing statistics are not an error.
    async fn job_elapsed(&self, job_id: &str, location: Option<&str>) -> Option<chrono::Duration> {
        let mut request = self.http.get(self.project_url(&format!("jobs/{}", job_id)));
        if let Some(location) = location {
            request = request.query(&[("location", location)]);
        }
        match self.send_json::<Job>(request).await {
            Ok(job) => job.statistics.and_then(|s| s.elapsed()),
            Err(e) => {
                debug!("Could not read statistics of job {}: {}", job_id, e);
                None
            }
        }
    }
}

fn job_failure(response: &QueryResponse) -> Option<String> {
    let messages: Vec<String> = response
        .errors
        .iter()
        .filter_map(|e| e.message.clone().or_else(|| e.reason.clone()))
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}

fn append_rows(table: &mut TabularResult, response: &QueryResponse) {
    table.rows.extend(
        response
            .rows
            .iter()
            .map(|row| row.f.iter().map(|cell| cell.as_text()).collect()),
    );
}

#[async_trait]
impl QueryExecutor for BigQueryClient {
    async fn submit(&self, request: &QueryRequest) -> Result<QueryOutcome, WarehouseError> {
        let body = self.request_body(request);
        debug!(
            "Submitting query (dry run: {}, request id {})",
            request.dry_run, body.request_id
        );

        let http_request = self.http.post(self.project_url("queries")).json(&body);
        let mut response: QueryResponse = self
            .send_json(http_request)
            .await
            .map_err(WarehouseError::QuerySubmissionFailure)?;
        if let Some(failure) = job_failure(&response) {
            return Err(WarehouseError::QuerySubmissionFailure(failure));
        }

        if request.dry_run {
            return Ok(QueryOutcome {
                table: TabularResult::new(response.column_names(), Vec::new()),
                bytes_processed: response.bytes_processed(),
                cache_hit: false,
                job_id: None,
                elapsed: None,
            });
        }

        let job = response.job_reference.clone().ok_or_else(|| {
            WarehouseError::QuerySubmissionFailure("response has no job reference".to_string())
        })?;
        let location = job.location.clone().or_else(|| self.config.location.clone());

        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        while !response.is_complete() {
            if Instant::now() >= deadline {
                return Err(WarehouseError::QueryMaterializationFailure(format!(
                    "job {} did not finish within {} ms",
                    job.job_id, self.config.timeout_ms
                )));
            }
            debug!("Waiting for job {}", job.job_id);
            response = self
                .query_results(&job.job_id, location.as_deref(), None)
                .await?;
        }
        if let Some(failure) = job_failure(&response) {
            return Err(WarehouseError::QueryMaterializationFailure(failure));
        }

        let mut table = TabularResult::new(response.column_names(), Vec::new());
        append_rows(&mut table, &response);
        let bytes_processed = response.bytes_processed();
        let cache_hit = response.cache_hit.unwrap_or(false);

        let mut page_token = response.page_token.clone();
        while let Some(token) = page_token {
            let page = self
                .query_results(&job.job_id, location.as_deref(), Some(&token))
                .await?;
            append_rows(&mut table, &page);
            page_token = page.page_token;
        }

        let elapsed = self.job_elapsed(&job.job_id, location.as_deref()).await;
        Ok(QueryOutcome {
            table,
            bytes_processed,
            cache_hit,
            job_id: Some(job.job_id),
            elapsed,
        })
    }

    async fn table_schema(&self, table: &TableRef) -> Result<Vec<ColumnInfo>, WarehouseError> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.config.endpoint.trim_end_matches('/'),
            table.project,
            table.dataset,
            table.table
        );
        let response: Table = self.send_json(self.http.get(url)).await.map_err(|reason| {
            WarehouseError::SchemaIntrospection {
                table: table.to_string(),
                reason,
            }
        })?;

        let columns: Vec<ColumnInfo> = response
            .schema
            .map(|schema| schema.fields.iter().map(ColumnInfo::from).collect())
            .unwrap_or_default();
        debug!("Table {} has {} columns", table, columns.len());
        Ok(columns)
    }
}
