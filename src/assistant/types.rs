//! Tipos de requisição e resposta do endpoint `v1/messages`.
//!
//! Só o subconjunto usado pelo rollcall: um prompt de sistema opcional,
//! mensagens de texto e blocos de texto na resposta.

use serde::{Deserialize, Serialize};

/// Corpo da requisição para `/v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    /// Instrução de sistema; omitida do JSON quando ausente.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl MessagesRequest {
    /// Requisição de um único turno do usuário.
    pub fn single(model: &str, max_tokens: u32, content: String) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            system: None,
            messages: vec![Message {
                role: "user".into(),
                content,
            }],
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" ou "assistant".
    pub role: String,
    pub content: String,
}

/// Resposta do endpoint `/v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl MessagesResponse {
    /// Texto do primeiro bloco, sem espaços nas pontas.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.content_type == "text")
            .map(|b| b.text.trim())
            .filter(|t| !t.is_empty())
    }
}

/// Um bloco de conteúdo. `content_type` vira `"type"` no JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
