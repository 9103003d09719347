//! BrasilAPI provider, the second registry source.
//!
//! Same public data as ReceitaWS but under different field names, with the
//! primary CNAE split into a numeric code and a description and the phone
//! split into DDD and number.

use serde::Deserialize;
use sonda_core::{Activity, Address, Cnpj, CompanyRecord, Shareholder};
use tracing::debug;

use crate::provider::{ProviderError, RegistryProvider};

const NAME: &str = "brasilapi";
const DEFAULT_BASE_URL: &str = "https://brasilapi.com.br";

/// Client for the BrasilAPI public CNPJ endpoint.
pub struct BrasilApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RawCompany {
    razao_social: Option<String>,
    nome_fantasia: Option<String>,
    descricao_situacao_cadastral: Option<String>,
    porte: Option<String>,
    data_inicio_atividade: Option<String>,
    ddd_telefone_1: Option<String>,
    telefone_1: Option<String>,
    logradouro: Option<String>,
    numero: Option<String>,
    complemento: Option<String>,
    bairro: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    cep: Option<String>,
    cnae_fiscal: Option<u64>,
    descricao_atividade_economica_principal: Option<String>,
    #[serde(default)]
    socios: Vec<RawPartner>,
    capital_social: Option<f64>,
    natureza_juridica: Option<String>,
}

#[derive(Deserialize)]
struct RawPartner {
    nome: Option<String>,
    qualificacao_socio: Option<String>,
}

impl BrasilApi {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// `base_url` should be like `https://brasilapi.com.br` (no trailing
    /// slash).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for BrasilApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RegistryProvider for BrasilApi {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, cnpj: &Cnpj) -> Result<CompanyRecord, ProviderError> {
        let url = format!("{}/api/cnpj/v1/{}", self.base_url, cnpj.as_str());
        debug!(url = %url, "querying BrasilAPI");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let raw: RawCompany = serde_json::from_str(&resp.text().await?)?;
        Ok(normalize(cnpj, raw))
    }
}

fn normalize(cnpj: &Cnpj, raw: RawCompany) -> CompanyRecord {
    // The DDD decides whether a phone exists at all.
    let phone = raw
        .ddd_telefone_1
        .filter(|ddd| !ddd.trim().is_empty())
        .map(|ddd| format!("({}) {}", ddd, raw.telefone_1.unwrap_or_default()));

    let address = if raw.logradouro.is_some() || raw.municipio.is_some() {
        Some(Address {
            street: raw.logradouro.unwrap_or_default(),
            number: raw.numero.unwrap_or_default(),
            complement: raw.complemento.filter(|c| !c.trim().is_empty()),
            district: raw.bairro.unwrap_or_default(),
            city: raw.municipio.unwrap_or_default(),
            state: raw.uf.unwrap_or_default(),
            postal_code: raw.cep.unwrap_or_default(),
        })
    } else {
        None
    };

    let primary_activities =
        if raw.cnae_fiscal.is_some() || raw.descricao_atividade_economica_principal.is_some() {
            vec![Activity {
                code: raw.cnae_fiscal.map(|c| c.to_string()).unwrap_or_default(),
                description: raw
                    .descricao_atividade_economica_principal
                    .unwrap_or_default(),
            }]
        } else {
            Vec::new()
        };

    CompanyRecord {
        cnpj: cnpj.clone(),
        legal_name: raw.razao_social.unwrap_or_default(),
        trade_name: raw.nome_fantasia.filter(|s| !s.trim().is_empty()),
        registration_status: raw.descricao_situacao_cadastral,
        size_class: raw.porte,
        founded: raw.data_inicio_atividade,
        phone,
        email: None,
        address,
        primary_activities,
        secondary_activities: Vec::new(),
        shareholders: raw
            .socios
            .into_iter()
            .map(|p| Shareholder {
                name: p.nome.unwrap_or_default(),
                role: p.qualificacao_socio.unwrap_or_default(),
            })
            .collect(),
        share_capital: raw.capital_social.map(|v| v.to_string()),
        legal_nature: raw.natureza_juridica,
        source: NAME.to_string(),
        synthetic: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{
        "cnpj": "11222333000181",
        "razao_social": "EXEMPLO CONSULTORIA TRIBUTARIA LTDA",
        "nome_fantasia": "Exemplo Tributária",
        "descricao_situacao_cadastral": "ATIVA",
        "porte": "DEMAIS",
        "data_inicio_atividade": "2015-03-01",
        "ddd_telefone_1": "11",
        "telefone_1": "30000000",
        "logradouro": "Avenida Paulista",
        "numero": "1000",
        "complemento": "",
        "bairro": "Bela Vista",
        "municipio": "São Paulo",
        "uf": "SP",
        "cep": "01310100",
        "cnae_fiscal": 6920601,
        "descricao_atividade_economica_principal": "Atividades de contabilidade",
        "socios": [
            {"nome": "MARIA DA SILVA", "qualificacao_socio": "Sócio-Administrador"}
        ],
        "capital_social": 100000,
        "natureza_juridica": "Sociedade Empresária Limitada"
    }"#;

    fn cnpj() -> Cnpj {
        "11.222.333/0001-81".parse().unwrap()
    }

    #[test]
    fn normalizes_success_payload() {
        let raw: RawCompany = serde_json::from_str(SUCCESS).unwrap();
        let record = normalize(&cnpj(), raw);
        assert_eq!(record.legal_name, "EXEMPLO CONSULTORIA TRIBUTARIA LTDA");
        assert_eq!(record.trade_name.as_deref(), Some("Exemplo Tributária"));
        assert_eq!(record.registration_status.as_deref(), Some("ATIVA"));
        assert_eq!(record.founded.as_deref(), Some("2015-03-01"));
        assert_eq!(record.phone.as_deref(), Some("(11) 30000000"));
        assert_eq!(record.primary_activities.len(), 1);
        assert_eq!(record.primary_activities[0].code, "6920601");
        assert_eq!(
            record.primary_activities[0].description,
            "Atividades de contabilidade"
        );
        assert_eq!(record.shareholders.len(), 1);
        assert_eq!(record.shareholders[0].role, "Sócio-Administrador");
        assert_eq!(record.share_capital.as_deref(), Some("100000"));
        let address = record.address.unwrap();
        assert_eq!(address.city, "São Paulo");
        assert!(address.complement.is_none());
        assert_eq!(record.source, "brasilapi");
    }

    #[test]
    fn phone_requires_a_ddd() {
        let raw: RawCompany =
            serde_json::from_str(r#"{"razao_social": "X LTDA", "telefone_1": "30000000"}"#)
                .unwrap();
        let record = normalize(&cnpj(), raw);
        assert!(record.phone.is_none());
    }

    #[test]
    fn minimal_payload_yields_bare_record() {
        let raw: RawCompany = serde_json::from_str(r#"{"razao_social": "X LTDA"}"#).unwrap();
        let record = normalize(&cnpj(), raw);
        assert!(record.primary_activities.is_empty());
        assert!(record.shareholders.is_empty());
        assert!(record.address.is_none());
        assert!(record.share_capital.is_none());
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        let provider = BrasilApi::with_base_url("https://brasilapi.com.br/".into());
        assert_eq!(provider.base_url, "https://brasilapi.com.br");
    }
}
