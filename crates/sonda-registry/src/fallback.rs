//! Offline fallback provider.
//!
//! Returns a fixed consultancy profile so downstream flows can proceed when
//! both registries are unreachable. Records are marked `synthetic` and must
//! never be mistaken for registry data.

use std::time::Duration;

use sonda_core::{Activity, Address, Cnpj, CompanyRecord, Shareholder};
use tracing::debug;

use crate::provider::{ProviderError, RegistryProvider};

const NAME: &str = "fallback";

/// Last-resort provider that fabricates a deterministic record.
pub struct StaticFallback {
    delay: Duration,
}

impl StaticFallback {
    /// The default delay imitates a slow network round trip so callers
    /// exercise the same waiting path as with the real providers.
    pub fn new() -> Self {
        Self::with_delay(Duration::from_secs(1))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for StaticFallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RegistryProvider for StaticFallback {
    fn name(&self) -> &'static str {
        NAME
    }

    fn synthetic(&self) -> bool {
        true
    }

    async fn fetch(&self, cnpj: &Cnpj) -> Result<CompanyRecord, ProviderError> {
        tokio::time::sleep(self.delay).await;
        debug!(cnpj = cnpj.as_str(), "serving synthetic fallback record");
        Ok(synthetic_record(cnpj))
    }
}

/// The fixed profile, echoing the requested CNPJ.
fn synthetic_record(cnpj: &Cnpj) -> CompanyRecord {
    CompanyRecord {
        cnpj: cnpj.clone(),
        legal_name: "EXEMPLO CONSULTORIA TRIBUTARIA LTDA".to_string(),
        trade_name: Some("Exemplo Consultoria".to_string()),
        registration_status: Some("ATIVA".to_string()),
        size_class: Some("DEMAIS".to_string()),
        founded: Some("01/03/2015".to_string()),
        phone: Some("(11) 3000-0000".to_string()),
        email: Some("contato@exemplo.com.br".to_string()),
        address: Some(Address {
            street: "Avenida Paulista".to_string(),
            number: "1000".to_string(),
            complement: Some("Conjunto 42".to_string()),
            district: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            postal_code: "01310-100".to_string(),
        }),
        primary_activities: vec![Activity {
            code: "69.20-6-01".to_string(),
            description: "Atividades de contabilidade".to_string(),
        }],
        secondary_activities: vec![Activity {
            code: "70.20-4-00".to_string(),
            description: "Atividades de consultoria em gestão empresarial".to_string(),
        }],
        shareholders: vec![
            Shareholder {
                name: "MARIA DA SILVA".to_string(),
                role: "49-Sócio-Administrador".to_string(),
            },
            Shareholder {
                name: "JOSE DOS SANTOS".to_string(),
                role: "22-Sócio".to_string(),
            },
        ],
        share_capital: Some("100000.00".to_string()),
        legal_nature: Some("206-2 - Sociedade Empresária Limitada".to_string()),
        source: NAME.to_string(),
        synthetic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_record_echoes_requested_cnpj() {
        let provider = StaticFallback::with_delay(Duration::ZERO);
        let cnpj: Cnpj = "45.997.418/0001-53".parse().unwrap();
        let record = provider.fetch(&cnpj).await.unwrap();
        assert_eq!(record.cnpj, cnpj);
        assert!(record.synthetic);
        assert_eq!(record.source, "fallback");
        assert!(!record.legal_name.is_empty());
    }

    #[test]
    fn provider_declares_itself_synthetic() {
        assert!(StaticFallback::new().synthetic());
    }
}
