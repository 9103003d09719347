//! The provider abstraction every registry source implements.

use async_trait::async_trait;
use sonda_core::{Cnpj, CompanyRecord};
use thiserror::Error;

/// Failure of a single provider attempt.
///
/// Carried to the caller only when the whole chain is exhausted; otherwise
/// the chain logs it and moves on to the next source.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider rejected the query: {0}")]
    Rejected(String),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One source of company registry data.
///
/// Implementations convert every failure mode of their own transport and
/// payload into a [`ProviderError`]; nothing else may escape `fetch`.
#[async_trait]
pub trait RegistryProvider: Send + Sync {
    /// Short name stamped on returned records and used in logs.
    fn name(&self) -> &'static str;

    /// True when the provider fabricates placeholder data instead of
    /// querying a real registry.
    fn synthetic(&self) -> bool {
        false
    }

    async fn fetch(&self, cnpj: &Cnpj) -> Result<CompanyRecord, ProviderError>;
}
