//! The ordered lookup chain over registry providers.

use std::time::Duration;

use sonda_core::{Cnpj, CnpjError, CompanyRecord};
use thiserror::Error;
use tracing::{info, warn};

use crate::brasil_api::BrasilApi;
use crate::fallback::StaticFallback;
use crate::provider::{ProviderError, RegistryProvider};
use crate::receita_ws::ReceitaWs;

/// Overall deadline applied to a lookup unless overridden.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum LookupError {
    /// The input failed validation; the network is never touched.
    #[error(transparent)]
    Invalid(#[from] CnpjError),
    #[error("no registry providers configured")]
    NoProviders,
    #[error("all registry providers failed; last error: {last}")]
    Exhausted { last: ProviderError },
    #[error("registry lookup timed out after {after:?}")]
    TimedOut { after: Duration },
}

/// Resolves CNPJs by trying providers strictly in order.
///
/// The first provider to answer wins and the rest are never queried. A
/// provider failure is logged and the chain moves on; only when every
/// provider has failed does the error surface. Fallback data appears only
/// when a fallback provider is explicitly part of the chain.
pub struct RegistryClient {
    providers: Vec<Box<dyn RegistryProvider>>,
    deadline: Option<Duration>,
}

impl RegistryClient {
    /// ReceitaWS, then BrasilAPI, then the synthetic fallback.
    pub fn default_chain() -> Self {
        Self::with_providers(vec![
            Box::new(ReceitaWs::new()),
            Box::new(BrasilApi::new()),
            Box::new(StaticFallback::new()),
        ])
    }

    pub fn with_providers(providers: Vec<Box<dyn RegistryProvider>>) -> Self {
        Self {
            providers,
            deadline: Some(DEFAULT_DEADLINE),
        }
    }

    /// `None` removes the deadline entirely.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Provider names in the order they will be tried.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Validates `input`, then runs the provider chain under the deadline.
    ///
    /// The deadline cancels the in-flight chain; a slow provider cannot
    /// hold the lookup past it.
    pub async fn lookup(&self, input: &str) -> Result<CompanyRecord, LookupError> {
        let cnpj = Cnpj::parse(input)?;
        info!(cnpj = cnpj.as_str(), "resolving CNPJ");
        match self.deadline {
            Some(after) => match tokio::time::timeout(after, self.run_chain(&cnpj)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(after = ?after, "registry lookup deadline elapsed");
                    Err(LookupError::TimedOut { after })
                }
            },
            None => self.run_chain(&cnpj).await,
        }
    }

    async fn run_chain(&self, cnpj: &Cnpj) -> Result<CompanyRecord, LookupError> {
        let mut last = None;
        for provider in &self.providers {
            match provider.fetch(cnpj).await {
                Ok(mut record) => {
                    // The chain owns the stamp; providers cannot misreport
                    // their identity or pass fabricated data off as real.
                    record.source = provider.name().to_string();
                    record.synthetic = provider.synthetic();
                    info!(
                        provider = provider.name(),
                        synthetic = provider.synthetic(),
                        "registry lookup resolved"
                    );
                    return Ok(record);
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "registry provider failed");
                    last = Some(err);
                }
            }
        }
        match last {
            Some(last) => Err(LookupError::Exhausted { last }),
            None => Err(LookupError::NoProviders),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    const VALID: &str = "11.222.333/0001-81";

    struct Scripted {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        fail_status: Option<u16>,
        delay: Duration,
    }

    fn ok(name: &'static str) -> (Box<Scripted>, Arc<AtomicUsize>) {
        scripted(name, None, Duration::ZERO)
    }

    fn failing(name: &'static str, status: u16) -> (Box<Scripted>, Arc<AtomicUsize>) {
        scripted(name, Some(status), Duration::ZERO)
    }

    fn scripted(
        name: &'static str,
        fail_status: Option<u16>,
        delay: Duration,
    ) -> (Box<Scripted>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Box::new(Scripted {
            name,
            calls: calls.clone(),
            fail_status,
            delay,
        });
        (provider, calls)
    }

    fn bare_record(cnpj: &Cnpj, label: &str) -> CompanyRecord {
        CompanyRecord {
            cnpj: cnpj.clone(),
            legal_name: format!("{label} company"),
            trade_name: None,
            registration_status: None,
            size_class: None,
            founded: None,
            phone: None,
            email: None,
            address: None,
            primary_activities: vec![],
            secondary_activities: vec![],
            shareholders: vec![],
            share_capital: None,
            legal_nature: None,
            source: String::new(),
            synthetic: false,
        }
    }

    #[async_trait::async_trait]
    impl RegistryProvider for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, cnpj: &Cnpj) -> Result<CompanyRecord, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.fail_status {
                Some(status) => Err(ProviderError::Status {
                    status,
                    body: "unavailable".into(),
                }),
                None => Ok(bare_record(cnpj, self.name)),
            }
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits_the_chain() {
        let (first, first_calls) = ok("first");
        let (second, second_calls) = ok("second");
        let client = RegistryClient::with_providers(vec![first, second]);

        let record = client.lookup(VALID).await.unwrap();
        assert_eq!(record.legal_name, "first company");
        assert_eq!(record.source, "first");
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_fall_through_in_order() {
        let (a, a_calls) = failing("a", 500);
        let (b, b_calls) = ok("b");
        let client = RegistryClient::with_providers(vec![a, b]);

        let record = client.lookup(VALID).await.unwrap();
        assert_eq!(record.source, "b");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_carries_the_last_provider_error() {
        let (a, _) = failing("a", 500);
        let (b, _) = failing("b", 503);
        let client = RegistryClient::with_providers(vec![a, b]);

        match client.lookup(VALID).await {
            Err(LookupError::Exhausted {
                last: ProviderError::Status { status, .. },
            }) => assert_eq!(status, 503),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_input_never_touches_a_provider() {
        let (p, calls) = ok("p");
        let client = RegistryClient::with_providers(vec![p]);

        assert!(matches!(
            client.lookup("12.345").await,
            Err(LookupError::Invalid(CnpjError::InvalidFormat))
        ));
        assert!(matches!(
            client.lookup("11.222.333/0001-80").await,
            Err(LookupError::Invalid(CnpjError::ChecksumMismatch))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chain_without_fallback_surfaces_the_failure() {
        let (a, _) = failing("a", 502);
        let client = RegistryClient::with_providers(vec![a]);

        assert!(matches!(
            client.lookup(VALID).await,
            Err(LookupError::Exhausted { .. })
        ));
    }

    #[tokio::test]
    async fn exhausted_registries_recover_via_explicit_fallback() {
        let (a, _) = failing("a", 500);
        let client = RegistryClient::with_providers(vec![
            a,
            Box::new(StaticFallback::with_delay(Duration::ZERO)),
        ]);

        let record = client.lookup(VALID).await.unwrap();
        assert!(record.synthetic);
        assert_eq!(record.source, "fallback");
        assert_eq!(record.cnpj.as_str(), "11222333000181");
    }

    #[tokio::test]
    async fn deadline_cancels_a_slow_chain() {
        let (slow, calls) = scripted("slow", None, Duration::from_secs(5));
        let client = RegistryClient::with_providers(vec![slow])
            .with_deadline(Some(Duration::from_millis(50)));

        let started = Instant::now();
        match client.lookup(VALID).await {
            Err(LookupError::TimedOut { after }) => {
                assert_eq!(after, Duration::from_millis(50))
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_chain_reports_no_providers() {
        let client = RegistryClient::with_providers(vec![]);
        assert!(matches!(
            client.lookup(VALID).await,
            Err(LookupError::NoProviders)
        ));
    }

    #[test]
    fn default_chain_orders_known_providers() {
        let client = RegistryClient::default_chain();
        assert_eq!(
            client.provider_names(),
            vec!["receitaws", "brasilapi", "fallback"]
        );
        assert_eq!(client.deadline, Some(DEFAULT_DEADLINE));
    }
}
