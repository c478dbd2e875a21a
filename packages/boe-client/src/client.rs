//! Typed entry point over the executor, normalizer and validator.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::document::GenericDocument;
use crate::endpoint::{AuxiliaryTable, Endpoint, LawSection, ResourceCategory};
use crate::error::{ApiError, ErrorKind, Result};
use crate::executor::{AttemptObserver, RequestExecutor, RetryPolicy};
use crate::lookup::{self, CodeEntry, CodeQuery};
use crate::params;
use crate::query::{build_query, SearchFilters};
use crate::response::ApiResponse;
use crate::scan::{ScanReport, SummaryScan};
use crate::transport::{HttpRequest, ReqwestTransport, Transport};
use crate::validator::{ResultValidator, SearchResult, ValidationReport};
use crate::well_known::{self, WellKnownLaw};

pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Record fields flagging a law that is no longer in force.
const REPEAL_FLAGS: [&str; 2] = ["vigencia_agotada", "estatus_derogacion"];

/// A consolidated-legislation search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub filters: SearchFilters,
    pub offset: u32,
    pub limit: u32,
    /// Keep records flagged as repealed in [`SearchOutcome::records`].
    pub include_repealed: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filters: SearchFilters::default(),
            offset: 0,
            limit: DEFAULT_SEARCH_LIMIT,
            include_repealed: false,
        }
    }
}

impl SearchRequest {
    pub fn new(filters: SearchFilters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn including_repealed(mut self) -> Self {
        self.include_repealed = true;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub response: ApiResponse,
    /// Records of the answer, repealed ones dropped unless requested.
    pub records: Vec<GenericDocument>,
    /// Present when the search carried free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
    /// Known laws worth trying when the results look unrelated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<&'static WellKnownLaw>,
}

impl SearchOutcome {
    pub fn likely_incorrect(&self) -> bool {
        self.validation
            .as_ref()
            .is_some_and(|report| report.likely_incorrect)
    }
}

/// Client for the BOE open-data API.
///
/// Owns the connection pool; dropping the client (or calling
/// [`close`](Self::close)) releases it.
pub struct BoeClient {
    config: ClientConfig,
    policy: RetryPolicy,
    executor: RequestExecutor,
    validator: ResultValidator,
    shutdown: CancellationToken,
}

impl BoeClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build over any [`Transport`], e.g. a scripted one in tests.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        debug!(
            base_url = %config.base_url,
            transport = transport.name(),
            max_retries = config.max_retries,
            "BOE client ready"
        );
        Ok(Self {
            policy: config.retry_policy(),
            executor: RequestExecutor::new(transport),
            validator: ResultValidator::default(),
            shutdown: CancellationToken::new(),
            config,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    pub fn with_validator(mut self, validator: ResultValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token that aborts every call made through this client when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn endpoint(&self, category: ResourceCategory) -> Endpoint {
        Endpoint::new(self.config.base_url.as_str(), category)
    }

    /// GET `endpoint`, retrying transient faults, and split the envelope.
    pub async fn fetch(&self, endpoint: Endpoint, params: Vec<(String, String)>) -> Result<ApiResponse> {
        let request = self.request(endpoint).with_params(params);
        self.send(&request, &self.shutdown).await
    }

    /// Like [`fetch`](Self::fetch), abandoned when either `cancel` or the
    /// client token fires.
    pub async fn fetch_with_cancel(
        &self,
        endpoint: Endpoint,
        params: Vec<(String, String)>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        let request = self.request(endpoint).with_params(params);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = %request.url(), "BOE request cancelled by caller");
                Err(ApiError::cancelled(&request.url()))
            }
            result = self.send(&request, &self.shutdown) => result,
        }
    }

    /// Search consolidated legislation.
    ///
    /// Free-text searches are scored against their results; when the score
    /// is low the outcome carries suggestions from the well-known table.
    pub async fn search_legislation(&self, search: &SearchRequest) -> Result<SearchOutcome> {
        params::validate_limit(search.limit)?;
        let mut filters = search.filters.clone();
        filters.date_from = api_date("date_from", &filters.date_from)?;
        filters.date_to = api_date("date_to", &filters.date_to)?;

        let mut request = self
            .request(self.endpoint(ResourceCategory::Legislation))
            .with_param("offset", search.offset)
            .with_param("limit", search.limit);
        if filters.has_terms() {
            if let Some(payload) = build_query(&filters).to_payload() {
                request = request.with_param("query", payload);
            }
        }
        if let Some(from) = &filters.date_from {
            request = request.with_param("from", from);
        }
        if let Some(to) = &filters.date_to {
            request = request.with_param("to", to);
        }

        info!(
            text = ?filters.search_text(),
            offset = search.offset,
            limit = search.limit,
            "Searching consolidated legislation"
        );
        let response = self.send(&request, &self.shutdown).await?;

        let validation = filters.search_text().map(|text| {
            let results: Vec<SearchResult> = response
                .records()
                .into_iter()
                .map(SearchResult::from_document)
                .collect();
            self.validator.validate(text, &results)
        });

        let suggestions = match &validation {
            Some(report) if report.likely_incorrect => {
                warn!(
                    search_text = %report.search_text,
                    confidence = report.confidence,
                    total = report.total_results,
                    matching = report.matching_results,
                    "Search results probably do not match the query"
                );
                well_known::suggestions_for(&report.search_text)
            }
            _ => Vec::new(),
        };

        let records = response
            .records()
            .into_iter()
            .filter(|record| search.include_repealed || !is_repealed(record))
            .cloned()
            .collect();

        Ok(SearchOutcome {
            response,
            records,
            validation,
            suggestions,
        })
    }

    /// A consolidated law, whole or one section of it.
    pub async fn get_law(&self, law_id: &str, section: Option<&LawSection>) -> Result<ApiResponse> {
        params::validate_law_id(law_id)?;
        let mut endpoint = self
            .endpoint(ResourceCategory::Legislation)
            .with_resource(format!("id/{}", law_id));
        if let Some(section) = section {
            if let LawSection::TextBlock(block_id) = section {
                params::validate_segment("block_id", block_id)?;
            }
            endpoint = endpoint.with_subsection(section.path());
        }

        info!(law_id, section = ?section, "Fetching consolidated law");
        self.send(&self.request(endpoint), &self.shutdown).await
    }

    /// BOE daily summary for a `YYYYMMDD` date.
    pub async fn get_boe_summary(&self, date: &str) -> Result<ApiResponse> {
        self.summary(ResourceCategory::BoeSummary, date).await
    }

    /// BORME daily summary for a `YYYYMMDD` date.
    pub async fn get_borme_summary(&self, date: &str) -> Result<ApiResponse> {
        self.summary(ResourceCategory::BormeSummary, date).await
    }

    pub async fn get_auxiliary_table(&self, table: AuxiliaryTable) -> Result<ApiResponse> {
        let endpoint = self
            .endpoint(ResourceCategory::AuxiliaryTables)
            .with_resource(table.name());
        info!(table = table.name(), "Fetching auxiliary table");
        self.send(&self.request(endpoint), &self.shutdown).await
    }

    /// BOE summaries for every publication day of `scan`, filtered.
    ///
    /// Days are fetched concurrently, bounded by the connection limit. A 404
    /// marks a day without a summary; any other failure aborts the scan.
    pub async fn scan_boe_summaries(&self, scan: &SummaryScan) -> Result<ScanReport> {
        let (start, end) = scan.window()?;
        let dates = scan.dates()?;
        info!(
            start = %start,
            end = %end,
            days = dates.len(),
            terms = ?scan.terms,
            "Scanning BOE summaries"
        );

        let answers = join_all(dates.iter().map(|date| self.get_boe_summary(date))).await;

        let mut report = ScanReport::new(start, end);
        for (date, answer) in dates.into_iter().zip(answers) {
            match answer {
                Ok(response) => {
                    report.entries.extend(scan.entries_in(&date, &response.data));
                    report.published.push(date);
                }
                Err(error) if error.kind == ErrorKind::Remote && error.code == 404 => {
                    debug!(date = %date, "No BOE summary published");
                    report.missing.push(date);
                }
                Err(error) => return Err(error),
            }
        }
        info!(
            published = report.published.len(),
            entries = report.entries.len(),
            "BOE summary scan finished"
        );
        Ok(report)
    }

    /// Rows of `tables` (all tables when empty) matching `query`.
    pub async fn lookup_codes(
        &self,
        query: &CodeQuery,
        tables: &[AuxiliaryTable],
    ) -> Result<Vec<CodeEntry>> {
        query.validate()?;
        let tables = if tables.is_empty() {
            &AuxiliaryTable::ALL[..]
        } else {
            tables
        };

        let answers = join_all(tables.iter().map(|table| self.get_auxiliary_table(*table))).await;

        let mut found = Vec::new();
        for (table, answer) in tables.iter().zip(answers) {
            found.extend(lookup::matching_entries(*table, &answer?, query));
        }
        debug!(query = ?query, matches = found.len(), "Auxiliary code lookup");
        Ok(found)
    }

    /// One-record search. Any failure reads as unhealthy.
    pub async fn health_check(&self) -> bool {
        match self
            .search_legislation(&SearchRequest::default().with_limit(1))
            .await
        {
            Ok(_) => true,
            Err(error) => {
                warn!(error = %error, "BOE health check failed");
                false
            }
        }
    }

    /// Release the connection pool, aborting calls still holding the token.
    pub fn close(self) {
        self.shutdown.cancel();
        debug!(base_url = %self.config.base_url, "BOE client closed");
    }

    async fn summary(&self, category: ResourceCategory, date: &str) -> Result<ApiResponse> {
        params::validate_date("date", date)?;
        let endpoint = self.endpoint(category).with_resource(date);
        info!(date, category = category.path(), "Fetching daily summary");
        self.send(&self.request(endpoint), &self.shutdown).await
    }

    fn request(&self, endpoint: Endpoint) -> HttpRequest {
        HttpRequest::get(endpoint, self.config.default_format, self.config.timeout)
    }

    async fn send(&self, request: &HttpRequest, cancel: &CancellationToken) -> Result<ApiResponse> {
        let body = self
            .executor
            .execute_with_cancel(request, &self.policy, cancel)
            .await?;
        ApiResponse::parse(&body, request.format)
    }
}

fn api_date(field: &str, value: &Option<String>) -> Result<Option<String>> {
    match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(date) => params::format_date_for_api(field, date).map(Some),
        None => Ok(None),
    }
}

fn is_repealed(record: &GenericDocument) -> bool {
    REPEAL_FLAGS
        .iter()
        .any(|flag| record.text_at(flag) == Some("S"))
}
