//! Cards (saved or unsaved questions) and dashboard cards.
//! A card owns its dataset query; edits swap in a new query value instead of mutating it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::query::DatasetQuery;

pub type CardId = i64;
pub type DashCardId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Absent until the card is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dataset_query: DatasetQuery,
    pub display: String,
    #[serde(default)]
    pub visualization_settings: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<JsonValue>>,
    /// Query builder lineage only; not part of the card API contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_card_id: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_write: Option<bool>,
    /// Models are cards flagged as datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<bool>,
}

impl Card {
    pub fn unsaved<S: Into<String>>(dataset_query: DatasetQuery, display: S) -> Self {
        Card {
            id: None,
            name: None,
            description: None,
            dataset_query,
            display: display.into(),
            visualization_settings: Map::new(),
            parameters: None,
            original_card_id: None,
            can_write: None,
            dataset: None,
        }
    }

    pub fn is_saved(&self) -> bool { self.id.is_some() }

    pub fn is_model(&self) -> bool { self.dataset.unwrap_or(false) }

    pub fn query(&self) -> &DatasetQuery { &self.dataset_query }

    /// New card carrying `query`; an edited saved card keeps its id until saved as a new question.
    pub fn with_query(&self, query: DatasetQuery) -> Self { Card { dataset_query: query, ..self.clone() } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashCard {
    pub id: DashCardId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<i64>,
    pub card: Card,
}
