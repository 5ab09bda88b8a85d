use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::domain::errors::ErrorCode;

// Catalog validated against the currently deployed provider version.
const BUILTIN_CATALOG: &str = include_str!("../../config/error_catalog.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read error catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse error catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("provider message id {0} is mapped more than once")]
    DuplicateId(i64),
    #[error("code {0} has more than one priority entry")]
    DuplicatePriority(ErrorCode),
    #[error("text rule for {0} has no patterns")]
    EmptyTextRule(ErrorCode),
}

// Rank of an internal code; lower means more specific for the end user.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPriorityEntry {
    pub code: ErrorCode,
    pub rank: u32,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRule {
    pub id: i64,
    pub code: ErrorCode,
}

// Matches when any pattern occurs and, if `requires` is set, any of those too.
#[derive(Debug, Clone, Deserialize)]
pub struct TextRule {
    pub code: ErrorCode,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
}

impl TextRule {
    fn matches(&self, lowered: &str) -> bool {
        let any = |needles: &[String]| {
            needles
                .iter()
                .any(|needle| !needle.is_empty() && lowered.contains(&needle.to_lowercase()))
        };
        any(&self.patterns) && (self.requires.is_empty() || any(&self.requires))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    priority: Vec<ErrorPriorityEntry>,
    #[serde(default)]
    ids: Vec<IdRule>,
    #[serde(default)]
    texts: Vec<TextRule>,
}

// Provider-version-specific translation tables, loaded as data.
#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    priorities: HashMap<ErrorCode, ErrorPriorityEntry>,
    ids: HashMap<i64, ErrorCode>,
    texts: Vec<TextRule>,
}

impl ErrorCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &str) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(raw)?;

        let mut priorities = HashMap::with_capacity(file.priority.len());
        for entry in file.priority {
            let code = entry.code;
            if priorities.insert(code, entry).is_some() {
                return Err(CatalogError::DuplicatePriority(code));
            }
        }

        let mut ids = HashMap::with_capacity(file.ids.len());
        for rule in file.ids {
            if ids.insert(rule.id, rule.code).is_some() {
                return Err(CatalogError::DuplicateId(rule.id));
            }
        }

        if let Some(rule) = file.texts.iter().find(|rule| rule.patterns.is_empty()) {
            return Err(CatalogError::EmptyTextRule(rule.code));
        }

        Ok(Self {
            priorities,
            ids,
            texts: file.texts,
        })
    }

    pub fn rank(&self, code: ErrorCode) -> Option<u32> {
        self.priorities.get(&code).map(|entry| entry.rank)
    }

    pub fn message(&self, code: ErrorCode) -> &str {
        self.priorities
            .get(&code)
            .and_then(|entry| entry.message.as_deref())
            .unwrap_or_else(|| code.default_message())
    }

    pub fn code_for_id(&self, id: i64) -> Option<ErrorCode> {
        self.ids.get(&id).copied()
    }

    // Codes of every text rule matching `text`, deduplicated, in table order.
    pub fn codes_for_text(&self, text: &str) -> Vec<ErrorCode> {
        let lowered = text.to_lowercase();
        let mut seen = HashSet::new();
        self.texts
            .iter()
            .filter(|rule| rule.matches(&lowered))
            .map(|rule| rule.code)
            .filter(|code| seen.insert(*code))
            .collect()
    }
}
