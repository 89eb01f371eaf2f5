use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::catalog::{Specialist, SpecialistCatalog, GENERAL_PHYSICIAN_ID};
use crate::ai::{strip_code_fences, CompletionError, CompletionService};

/// Upper bound on the number of specialists returned for one set of notes
pub const MAX_SUGGESTIONS: usize = 3;

/// Symptom keyword → candidate specialist ids, scanned in order
const SYMPTOM_KEYWORDS: &[(&str, &[u32])] = &[
    ("headache", &[1, 4, 10]),
    ("fever", &[1, 2]),
    ("cough", &[1, 7]),
    ("skin", &[3]),
    ("rash", &[3]),
    ("acne", &[3]),
    ("heart", &[6]),
    ("chest", &[6]),
    ("blood pressure", &[6]),
    ("bone", &[8]),
    ("joint", &[8]),
    ("muscle", &[8]),
    ("pain", &[1, 8]),
    ("ear", &[7]),
    ("nose", &[7]),
    ("throat", &[7]),
    ("mental", &[4]),
    ("stress", &[4]),
    ("anxiety", &[4]),
    ("depression", &[4]),
    ("nutrition", &[5]),
    ("diet", &[5]),
    ("weight", &[5]),
    ("women", &[9]),
    ("pregnancy", &[9]),
    ("dental", &[10]),
    ("tooth", &[10]),
    ("child", &[2]),
    ("baby", &[2]),
];

const SUGGEST_INSTRUCTIONS: &str = "Based on the user's symptoms, suggest ONLY doctors from the list in the system message. \
Return JSON of the form {\"doctors\": [{\"id\": number}]}, most relevant first, with nothing else.";

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("suggestion response was not valid JSON: {0}")]
    Malformed(String),
}

/// Deterministic suggestion used when the completion service is unavailable
///
/// The first keyword found in the notes decides the candidates; with no match
/// the general physician is suggested.
pub fn suggest_by_keywords(catalog: &SpecialistCatalog, notes: &str) -> Vec<Specialist> {
    let notes = notes.to_lowercase();

    let ids = SYMPTOM_KEYWORDS
        .iter()
        .find(|(keyword, _)| notes.contains(keyword))
        .map(|(_, ids)| *ids)
        .unwrap_or(&[GENERAL_PHYSICIAN_ID]);

    let mut suggested = catalog.resolve(ids);
    suggested.truncate(MAX_SUGGESTIONS);
    suggested
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    doctors: Vec<SuggestedDoctor>,
}

#[derive(Debug, Deserialize)]
struct SuggestedDoctor {
    id: u32,
}

/// Suggests specialists for a patient's symptom notes
pub struct SpecialistSuggester {
    completion: Arc<dyn CompletionService>,
    catalog: Arc<SpecialistCatalog>,
}

impl SpecialistSuggester {
    pub fn new(completion: Arc<dyn CompletionService>, catalog: Arc<SpecialistCatalog>) -> Self {
        Self {
            completion,
            catalog,
        }
    }

    pub async fn suggest(&self, notes: &str) -> Result<Vec<Specialist>, SuggestError> {
        let system = serde_json::to_string(self.catalog.all())
            .map_err(|e| SuggestError::Malformed(e.to_string()))?;
        let user = format!("User Notes/symptoms: {}\n\n{}", notes, SUGGEST_INSTRUCTIONS);

        let raw = match self.completion.complete(&system, &user).await {
            Ok(raw) => raw,
            Err(CompletionError::RateLimited) => {
                warn!("Suggestion rate limited, falling back to keyword matching");
                return Ok(suggest_by_keywords(&self.catalog, notes));
            }
            Err(e) => return Err(e.into()),
        };

        let parsed: SuggestResponse = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| SuggestError::Malformed(e.to_string()))?;

        // Only personas we actually ship can be connected
        let mut seen = HashSet::new();
        let ids: Vec<u32> = parsed
            .doctors
            .iter()
            .map(|d| d.id)
            .filter(|id| seen.insert(*id))
            .collect();
        let mut suggested = self.catalog.resolve(&ids);
        suggested.truncate(MAX_SUGGESTIONS);

        if suggested.is_empty() {
            info!("No catalog specialists in suggestion response, using keyword matching");
            return Ok(suggest_by_keywords(&self.catalog, notes));
        }

        Ok(suggested)
    }
}
