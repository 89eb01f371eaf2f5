//! AI specialist personas
//!
//! - `Specialist`: persona configuration selected for a consultation
//! - `SpecialistCatalog`: read-only id → persona lookup
//! - `SpecialistSuggester`: symptom notes → ranked specialists, with a
//!   keyword fallback when the completion service rate-limits

mod catalog;
mod suggest;

pub use catalog::{Specialist, SpecialistCatalog, GENERAL_PHYSICIAN_ID};
pub use suggest::{suggest_by_keywords, SpecialistSuggester, SuggestError, MAX_SUGGESTIONS};
