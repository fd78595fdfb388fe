use serde::{Deserialize, Deserializer, Serialize};

use crate::{ChatId, ProjectId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "clerk_id", default)]
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub project_settings: Vec<ProjectSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RagStrategy {
    #[default]
    Basic,
    Hybrid,
    MultiQueryVector,
    MultiQueryHybrid,
}

impl RagStrategy {
    /// Value the strategy picker uses for this strategy.
    pub fn ui_value(self) -> &'static str {
        match self {
            Self::Basic => "vector",
            Self::Hybrid => "hybrid",
            Self::MultiQueryVector => "multi-query-vector",
            Self::MultiQueryHybrid => "multi-query-hybrid",
        }
    }

    pub fn from_backend_value(value: &str) -> Self {
        match value {
            "hybrid" => Self::Hybrid,
            "multi_query_vector" => Self::MultiQueryVector,
            "multi_query_hybrid" => Self::MultiQueryHybrid,
            _ => Self::Basic,
        }
    }

    /// Unknown picker values fall back to plain vector search.
    pub fn from_ui_value(value: &str) -> Self {
        match value {
            "hybrid" => Self::Hybrid,
            "multi-query-vector" => Self::MultiQueryVector,
            "multi-query-hybrid" => Self::MultiQueryHybrid,
            _ => Self::Basic,
        }
    }
}

impl<'de> Deserialize<'de> for RagStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_backend_value(&value))
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    #[default]
    Simple,
    Agentic,
}

impl<'de> Deserialize<'de> for AgentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(match value.as_str() {
            "agentic" => Self::Agentic,
            _ => Self::Simple,
        })
    }
}

/// Retrieval configuration attached 1:1 to a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSettings {
    pub id: String,
    pub project_id: ProjectId,
    pub embedding_model: String,
    pub rag_strategy: RagStrategy,
    pub agent_type: AgentType,
    pub chunks_per_search: u32,
    pub final_context_size: u32,
    pub similarity_threshold: f64,
    pub number_of_queries: u32,
    pub reranking_enabled: bool,
    #[serde(default)]
    pub reranking_model: String,
    pub vector_weight: f64,
    pub keyword_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of `PUT /api/projects/{id}/settings`: every editable field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsUpdate {
    pub embedding_model: String,
    pub rag_strategy: RagStrategy,
    pub agent_type: AgentType,
    pub chunks_per_search: u32,
    pub final_context_size: u32,
    pub similarity_threshold: f64,
    pub number_of_queries: u32,
    pub reranking_enabled: bool,
    pub reranking_model: String,
    pub vector_weight: f64,
    pub keyword_weight: f64,
}

impl From<&ProjectSettings> for SettingsUpdate {
    fn from(settings: &ProjectSettings) -> Self {
        Self {
            embedding_model: settings.embedding_model.clone(),
            rag_strategy: settings.rag_strategy,
            agent_type: settings.agent_type,
            chunks_per_search: settings.chunks_per_search,
            final_context_size: settings.final_context_size,
            similarity_threshold: settings.similarity_threshold,
            number_of_queries: settings.number_of_queries,
            reranking_enabled: settings.reranking_enabled,
            reranking_model: settings.reranking_model.clone(),
            vector_weight: settings.vector_weight,
            keyword_weight: settings.keyword_weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    pub project_id: ProjectId,
    #[serde(rename = "clerk_id", default)]
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewChat {
    pub title: String,
    pub project_id: ProjectId,
}
