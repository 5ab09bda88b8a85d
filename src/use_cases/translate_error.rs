use crate::domain::catalog::ErrorCatalog;
use crate::domain::{ErrorCode, ProviderMessage, RawErrorPayload};

// One stable error code plus the wording shown to the end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchSource {
    Id,
    Text,
}

// A ranked code produced by one lookup strategy for one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub code: ErrorCode,
    pub rank: u32,
    pub source: MatchSource,
}

// Strategy (a): numeric id lookup. Unknown ids and unranked codes do not match.
pub fn rank_by_id(message: &ProviderMessage, catalog: &ErrorCatalog) -> Option<Candidate> {
    if message.numeric_id == 0 {
        return None;
    }
    let code = catalog.code_for_id(message.numeric_id)?;
    let rank = catalog.rank(code)?;
    Some(Candidate {
        code,
        rank,
        source: MatchSource::Id,
    })
}

// Strategy (b): free-text rules; keeps the best-ranked rule that matches.
pub fn rank_by_text(message: &ProviderMessage, catalog: &ErrorCatalog) -> Option<Candidate> {
    if message.text.trim().is_empty() {
        return None;
    }
    catalog
        .codes_for_text(&message.text)
        .into_iter()
        .filter_map(|code| {
            catalog.rank(code).map(|rank| Candidate {
                code,
                rank,
                source: MatchSource::Text,
            })
        })
        .fold(None, pick_lower)
}

// Lowest rank wins; on ties the earlier candidate stays.
fn pick_lower(best: Option<Candidate>, next: Candidate) -> Option<Candidate> {
    match best {
        Some(current) if current.rank <= next.rank => Some(current),
        _ => Some(next),
    }
}

// Reduce every message through both strategies into the single most actionable error.
pub fn translate(payload: &RawErrorPayload, catalog: &ErrorCatalog) -> Translation {
    let best = payload
        .messages
        .iter()
        .flat_map(|message| [rank_by_id(message, catalog), rank_by_text(message, catalog)])
        .flatten()
        .fold(None, pick_lower);

    match best {
        Some(candidate) => {
            tracing::debug!(
                code = %candidate.code,
                rank = candidate.rank,
                source = ?candidate.source,
                messages = payload.messages.len(),
                "translated provider error."
            );
            Translation {
                code: candidate.code,
                message: catalog.message(candidate.code).to_string(),
            }
        }
        None => {
            // Unmapped ids are worth adding to the catalog.
            let ids: Vec<i64> = payload.messages.iter().map(|m| m.numeric_id).collect();
            tracing::warn!(?ids, "no catalog entry for provider error.");
            Translation {
                code: ErrorCode::Validation,
                message: catalog.message(ErrorCode::Validation).to_string(),
            }
        }
    }
}
