//! Client for the BOE (Spanish Official State Gazette) open-data API.
//!
//! Fetches consolidated legislation, daily BOE/BORME summaries and auxiliary
//! code tables. JSON and XML answers normalize into one [`GenericDocument`]
//! tree, transient network faults are retried with linear backoff, and
//! free-text searches are scored for relevance because the remote search
//! often returns unrelated records.
//!
//! # Example
//!
//! ```rust,ignore
//! use boe_client::{BoeClient, ClientConfig, SearchFilters, SearchRequest};
//!
//! let client = BoeClient::new(ClientConfig::default())?;
//!
//! let search = SearchRequest::new(SearchFilters::new().with_title("protección de datos"));
//! let outcome = client.search_legislation(&search).await?;
//! if outcome.likely_incorrect() {
//!     for law in &outcome.suggestions {
//!         println!("try {}: {}", law.id, law.title);
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod lookup;
pub mod normalize;
pub mod params;
pub mod query;
pub mod response;
pub mod scan;
pub mod testing;
pub mod transport;
pub mod validator;
pub mod well_known;

pub use client::{BoeClient, SearchOutcome, SearchRequest};
pub use config::ClientConfig;
pub use document::GenericDocument;
pub use endpoint::{AuxiliaryTable, Endpoint, LawSection, ResourceCategory};
pub use error::{ApiError, ErrorKind, NetworkFailure, Result};
pub use executor::{AttemptEvent, AttemptObserver, RequestExecutor, RetryPolicy, TracingObserver};
pub use lookup::{CodeEntry, CodeQuery};
pub use normalize::{normalize, DocumentFormat};
pub use query::{build_query, Clause, SearchFilters, SearchQuery};
pub use response::{ApiResponse, ResponseStatus};
pub use scan::{ScanReport, ScanTally, SummaryEntry, SummaryScan};
pub use transport::{AttemptOutcome, HttpRequest, ReqwestTransport, Transport, TransportFault};
pub use validator::{ResultValidator, SearchResult, ValidationReport};
pub use well_known::{LawCategory, WellKnownLaw};
