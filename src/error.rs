//! Error taxonomy for the analysis pipeline.
//!
//! Category-provider failures never surface here: they are absorbed into
//! degraded metrics by the pipeline. Only malformed input, an unresolvable
//! address, an unreachable geocoder, a governor rejection, or an unexpected
//! internal fault abort a request.

use thiserror::Error;

/// A failure visible to callers of the pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The address was absent or shorter than the minimum after trimming.
    #[error("endereço inválido: {0}")]
    InvalidInput(String),

    /// The geocoder answered but found no candidates. Distinct from
    /// `Upstream`: the address is unresolvable, not the provider.
    #[error("endereço não encontrado")]
    AddressNotFound,

    /// The client exceeded a request-rate limit.
    #[error("limite de requisições excedido")]
    RateLimited,

    /// The geocoding provider could not be reached.
    #[error("serviço de geocodificação indisponível: {0}")]
    Upstream(String),

    /// Unexpected failure in derivation or narrative assembly.
    #[error("erro interno na análise")]
    Internal(#[from] anyhow::Error),
}

impl AnalysisError {
    /// Stable machine-readable kind, independent of the human message.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::AddressNotFound => "address_not_found",
            AnalysisError::RateLimited => "rate_limited",
            AnalysisError::Upstream(_) => "upstream_unavailable",
            AnalysisError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(
            AnalysisError::InvalidInput("x".to_string()).kind(),
            "invalid_input"
        );
        assert_eq!(AnalysisError::AddressNotFound.kind(), "address_not_found");
        assert_eq!(AnalysisError::RateLimited.kind(), "rate_limited");
        assert_eq!(
            AnalysisError::Upstream("timeout".to_string()).kind(),
            "upstream_unavailable"
        );
    }
}
