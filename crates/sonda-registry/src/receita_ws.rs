//! ReceitaWS provider, the primary registry source.

use serde::Deserialize;
use sonda_core::{Activity, Address, Cnpj, CompanyRecord, Shareholder};
use tracing::debug;

use crate::provider::{ProviderError, RegistryProvider};

const NAME: &str = "receitaws";
const DEFAULT_BASE_URL: &str = "https://www.receitaws.com.br";

/// Client for the ReceitaWS public CNPJ endpoint.
pub struct ReceitaWs {
    client: reqwest::Client,
    base_url: String,
}

/// ReceitaWS wire schema. Every field is optional; success responses carry
/// `status: "OK"` and rejections come back as HTTP 200 with
/// `status: "ERROR"` plus a message.
#[derive(Deserialize)]
struct RawCompany {
    status: Option<String>,
    message: Option<String>,
    nome: Option<String>,
    fantasia: Option<String>,
    situacao: Option<String>,
    porte: Option<String>,
    abertura: Option<String>,
    telefone: Option<String>,
    email: Option<String>,
    logradouro: Option<String>,
    numero: Option<String>,
    complemento: Option<String>,
    bairro: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    cep: Option<String>,
    #[serde(default)]
    atividade_principal: Vec<RawActivity>,
    #[serde(default)]
    atividades_secundarias: Vec<RawActivity>,
    #[serde(default)]
    qsa: Vec<RawPartner>,
    capital_social: Option<String>,
    natureza_juridica: Option<String>,
}

#[derive(Deserialize)]
struct RawActivity {
    code: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct RawPartner {
    nome: Option<String>,
    qual: Option<String>,
}

impl ReceitaWs {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// `base_url` should be like `https://www.receitaws.com.br` (no trailing
    /// slash).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for ReceitaWs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RegistryProvider for ReceitaWs {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn fetch(&self, cnpj: &Cnpj) -> Result<CompanyRecord, ProviderError> {
        let url = format!("{}/v1/cnpj/{}", self.base_url, cnpj.as_str());
        debug!(url = %url, "querying ReceitaWS");
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
        normalize(cnpj, raw)
    }
}

fn normalize(cnpj: &Cnpj, raw: RawCompany) -> Result<CompanyRecord, ProviderError> {
    if raw.status.as_deref() == Some("ERROR") {
        let message = raw.message.unwrap_or_else(|| "query rejected".to_string());
        return Err(ProviderError::Rejected(message));
    }

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

    Ok(CompanyRecord {
        cnpj: cnpj.clone(),
        legal_name: raw.nome.unwrap_or_default(),
        trade_name: raw.fantasia.filter(|s| !s.trim().is_empty()),
        registration_status: raw.situacao,
        size_class: raw.porte,
        founded: raw.abertura,
        phone: raw.telefone.filter(|s| !s.trim().is_empty()),
        email: raw.email.filter(|s| !s.trim().is_empty()),
        address,
        primary_activities: map_activities(raw.atividade_principal),
        secondary_activities: map_activities(raw.atividades_secundarias),
        shareholders: map_partners(raw.qsa),
        share_capital: raw.capital_social,
        legal_nature: raw.natureza_juridica,
        source: NAME.to_string(),
        synthetic: false,
    })
}

fn map_activities(raw: Vec<RawActivity>) -> Vec<Activity> {
    raw.into_iter()
        .map(|a| Activity {
            code: a.code.unwrap_or_default(),
            description: a.text.unwrap_or_default(),
        })
        .collect()
}

fn map_partners(raw: Vec<RawPartner>) -> Vec<Shareholder> {
    raw.into_iter()
        .map(|p| Shareholder {
            name: p.nome.unwrap_or_default(),
            role: p.qual.unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{
        "status": "OK",
        "cnpj": "11.222.333/0001-81",
        "nome": "EXEMPLO CONSULTORIA TRIBUTARIA LTDA",
        "fantasia": "Exemplo Tributária",
        "situacao": "ATIVA",
        "porte": "DEMAIS",
        "abertura": "01/03/2015",
        "telefone": "(11) 3000-0000",
        "email": "contato@exemplo.com.br",
        "logradouro": "Avenida Paulista",
        "numero": "1000",
        "complemento": "Conjunto 42",
        "bairro": "Bela Vista",
        "municipio": "São Paulo",
        "uf": "SP",
        "cep": "01.310-100",
        "atividade_principal": [
            {"code": "69.20-6-01", "text": "Atividades de contabilidade"}
        ],
        "atividades_secundarias": [
            {"code": "70.20-4-00", "text": "Atividades de consultoria em gestão empresarial"}
        ],
        "qsa": [
            {"nome": "MARIA DA SILVA", "qual": "49-Sócio-Administrador"},
            {"nome": "JOSE DOS SANTOS", "qual": "22-Sócio"}
        ],
        "capital_social": "100000.00",
        "natureza_juridica": "206-2 - Sociedade Empresária Limitada"
    }"#;

    fn cnpj() -> Cnpj {
        "11.222.333/0001-81".parse().unwrap()
    }

    #[test]
    fn normalizes_success_payload() {
        let raw: RawCompany = serde_json::from_str(SUCCESS).unwrap();
        let record = normalize(&cnpj(), raw).unwrap();
        assert_eq!(record.legal_name, "EXEMPLO CONSULTORIA TRIBUTARIA LTDA");
        assert_eq!(record.trade_name.as_deref(), Some("Exemplo Tributária"));
        assert_eq!(record.registration_status.as_deref(), Some("ATIVA"));
        assert_eq!(record.founded.as_deref(), Some("01/03/2015"));
        let address = record.address.unwrap();
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state, "SP");
        assert_eq!(address.complement.as_deref(), Some("Conjunto 42"));
        assert_eq!(record.primary_activities.len(), 1);
        assert_eq!(record.primary_activities[0].code, "69.20-6-01");
        assert_eq!(record.secondary_activities.len(), 1);
        assert_eq!(record.shareholders.len(), 2);
        assert_eq!(record.shareholders[0].name, "MARIA DA SILVA");
        assert_eq!(record.shareholders[0].role, "49-Sócio-Administrador");
        assert_eq!(record.share_capital.as_deref(), Some("100000.00"));
        assert_eq!(record.source, "receitaws");
        assert!(!record.synthetic);
    }

    #[test]
    fn error_status_maps_to_rejection() {
        let raw: RawCompany =
            serde_json::from_str(r#"{"status": "ERROR", "message": "CNPJ inválido"}"#).unwrap();
        match normalize(&cnpj(), raw) {
            Err(ProviderError::Rejected(message)) => assert_eq!(message, "CNPJ inválido"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn blank_optional_fields_become_none() {
        let raw: RawCompany = serde_json::from_str(
            r#"{"status": "OK", "nome": "EMPRESA SEM FANTASIA LTDA", "fantasia": "", "telefone": " "}"#,
        )
        .unwrap();
        let record = normalize(&cnpj(), raw).unwrap();
        assert!(record.trade_name.is_none());
        assert!(record.phone.is_none());
        assert!(record.address.is_none());
        assert!(record.shareholders.is_empty());
    }

    #[test]
    fn base_url_trims_trailing_slash() {
        let provider = ReceitaWs::with_base_url("https://www.receitaws.com.br/".into());
        assert_eq!(provider.base_url, "https://www.receitaws.com.br");
    }
}
