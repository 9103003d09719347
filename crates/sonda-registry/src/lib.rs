pub mod brasil_api;
pub mod client;
pub mod fallback;
pub mod provider;
pub mod receita_ws;

pub use brasil_api::BrasilApi;
pub use client::{LookupError, RegistryClient, DEFAULT_DEADLINE};
pub use fallback::StaticFallback;
pub use provider::{ProviderError, RegistryProvider};
pub use receita_ws::ReceitaWs;
