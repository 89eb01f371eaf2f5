use async_trait::async_trait;
use medvoice::ai::{CompletionError, CompletionService};
use medvoice::specialist::{
    suggest_by_keywords, SpecialistCatalog, SpecialistSuggester, SuggestError,
};
use std::sync::{Arc, Mutex};

enum Answer {
    Text(&'static str),
    RateLimited,
    Down,
}

struct ScriptedCompletion {
    answer: Answer,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    fn new(answer: Answer) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        match self.answer {
            Answer::Text(text) => Ok(text.to_string()),
            Answer::RateLimited => Err(CompletionError::RateLimited),
            Answer::Down => Err(CompletionError::Http {
                status: 500,
                body: "internal error".to_string(),
            }),
        }
    }
}

fn ids(specialists: &[medvoice::Specialist]) -> Vec<u32> {
    specialists.iter().map(|s| s.id).collect()
}

fn suggester(completion: Arc<ScriptedCompletion>) -> SpecialistSuggester {
    SpecialistSuggester::new(completion, Arc::new(SpecialistCatalog::builtin()))
}

#[test]
fn test_builtin_catalog() {
    let catalog = SpecialistCatalog::builtin();

    assert_eq!(catalog.all().len(), 10);
    let gp = catalog.get(1).unwrap();
    assert_eq!(gp.specialist, "General Physician");
    assert!(!gp.subscription_required);
    assert!(catalog.all().iter().all(|s| s.is_connectable()));
    assert!(catalog.get(42).is_none());
}

#[test]
fn test_keyword_fallback_uses_first_match() {
    let catalog = SpecialistCatalog::builtin();

    assert_eq!(ids(&suggest_by_keywords(&catalog, "Bad HEADACHE since Monday")), vec![1, 4, 10]);
    assert_eq!(ids(&suggest_by_keywords(&catalog, "an itchy rash")), vec![3]);
    // "fever" is listed before "cough"
    assert_eq!(ids(&suggest_by_keywords(&catalog, "cough and fever")), vec![1, 2]);
}

#[test]
fn test_keyword_fallback_defaults_to_general_physician() {
    let catalog = SpecialistCatalog::builtin();
    assert_eq!(ids(&suggest_by_keywords(&catalog, "feeling odd")), vec![1]);
    assert_eq!(ids(&suggest_by_keywords(&catalog, "")), vec![1]);
}

#[tokio::test]
async fn test_suggest_resolves_model_answer_against_catalog() {
    let completion = ScriptedCompletion::new(Answer::Text(
        "```json\n{\"doctors\": [{\"id\": 6}, {\"id\": 99}, {\"id\": 6}, {\"id\": 1}, {\"id\": 8}, {\"id\": 2}]}\n```",
    ));
    let result = suggester(completion.clone()).suggest("chest tightness").await.unwrap();

    assert_eq!(ids(&result), vec![6, 1, 8]);

    let prompts = completion.prompts.lock().unwrap();
    assert!(prompts[0].0.contains("Cardiologist"));
    assert!(prompts[0].1.contains("chest tightness"));
}

#[tokio::test]
async fn test_suggest_falls_back_when_rate_limited() {
    let result = suggester(ScriptedCompletion::new(Answer::RateLimited))
        .suggest("tooth ache")
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![10]);
}

#[tokio::test]
async fn test_suggest_falls_back_when_no_known_ids() {
    let result = suggester(ScriptedCompletion::new(Answer::Text(r#"{"doctors": [{"id": 77}]}"#)))
        .suggest("skin problems")
        .await
        .unwrap();

    assert_eq!(ids(&result), vec![3]);
}

#[tokio::test]
async fn test_suggest_surfaces_other_failures() {
    let err = suggester(ScriptedCompletion::new(Answer::Down))
        .suggest("headache")
        .await
        .unwrap_err();
    assert!(matches!(err, SuggestError::Completion(CompletionError::Http { status: 500, .. })));

    let err = suggester(ScriptedCompletion::new(Answer::Text("Consult a doctor.")))
        .suggest("headache")
        .await
        .unwrap_err();
    assert!(matches!(err, SuggestError::Malformed(_)));
}
