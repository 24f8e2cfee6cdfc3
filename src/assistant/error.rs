//! Tipos de erro do cliente do serviço de texto (API Anthropic Messages).
//!
//! [`AssistantError`] cobre rate limiting, erros HTTP da API, falhas de rede
//! e respostas que não puderam ser interpretadas. Nenhuma dessas falhas
//! chega ao núcleo da sessão: quem chama decide o fallback.

use thiserror::Error;

/// Erros que podem ocorrer ao conversar com o serviço de texto.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// O servidor retornou HTTP 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Qualquer outro status de erro (ex.: 401 chave inválida, 500 erro interno).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A resposta chegou, mas sem nenhum bloco de texto.
    #[error("response contained no text")]
    EmptyResponse,

    /// O texto retornado não tinha o formato esperado.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Nenhuma chave de API configurada.
    #[error("no API key configured")]
    MissingApiKey,
}
