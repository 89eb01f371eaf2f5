use serde::{Deserialize, Serialize};

/// Id of the general-practice persona used when nothing more specific matches
pub const GENERAL_PHYSICIAN_ID: u32 = 1;

/// A voice agent persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialist {
    pub id: u32,

    /// Display name (e.g., "Cardiologist")
    pub specialist: String,

    pub description: String,

    /// Image reference for the persona card
    pub image: String,

    /// System prompt handed to the agent's language model
    pub agent_prompt: String,

    /// Voice identity at the TTS provider
    pub voice_id: String,

    #[serde(default)]
    pub subscription_required: bool,
}

impl Specialist {
    /// A persona can only be connected if it has a prompt and a voice
    pub fn is_connectable(&self) -> bool {
        !self.agent_prompt.trim().is_empty() && !self.voice_id.trim().is_empty()
    }
}

/// Read-only specialist lookup
#[derive(Debug, Clone)]
pub struct SpecialistCatalog {
    specialists: Vec<Specialist>,
}

impl SpecialistCatalog {
    pub fn new(specialists: Vec<Specialist>) -> Self {
        Self { specialists }
    }

    /// The ten personas shipped with the service
    pub fn builtin() -> Self {
        let entry = |id: u32,
                     name: &str,
                     description: &str,
                     image: &str,
                     prompt: &str,
                     voice: &str,
                     gated: bool| Specialist {
            id,
            specialist: name.to_string(),
            description: description.to_string(),
            image: image.to_string(),
            agent_prompt: prompt.to_string(),
            voice_id: voice.to_string(),
            subscription_required: gated,
        };

        Self::new(vec![
            entry(
                1,
                "General Physician",
                "Helps with everyday health concerns and common symptoms.",
                "/doctor1.png",
                "You are a friendly General Physician AI. Greet the user and quickly ask what symptoms they are experiencing. Keep responses short and helpful.",
                "will",
                false,
            ),
            entry(
                2,
                "Pediatrician",
                "Expert in children's health, from babies to teens.",
                "/doctor2.png",
                "You are a kind Pediatrician AI. Ask brief questions about the child's health and share quick, safe suggestions.",
                "chris",
                true,
            ),
            entry(
                3,
                "Dermatologist",
                "Handles skin issues like rashes, acne, or infections.",
                "/doctor3.png",
                "You are a knowledgeable Dermatologist AI. Ask short questions about the skin issue and give simple, clear advice.",
                "sarge",
                true,
            ),
            entry(
                4,
                "Psychologist",
                "Supports mental health and emotional well-being.",
                "/doctor4.png",
                "You are a caring Psychologist AI. Ask how the user is feeling emotionally and give short, supportive tips.",
                "susan",
                true,
            ),
            entry(
                5,
                "Nutritionist",
                "Provides advice on healthy eating and weight management.",
                "/doctor5.png",
                "You are a motivating Nutritionist AI. Ask about current diet or goals and suggest quick, healthy tips.",
                "eileen",
                true,
            ),
            entry(
                6,
                "Cardiologist",
                "Focuses on heart health and blood pressure issues.",
                "/doctor6.png",
                "You are a calm Cardiologist AI. Ask about heart symptoms and offer brief, helpful advice.",
                "charlotte",
                true,
            ),
            entry(
                7,
                "ENT Specialist",
                "Treats ear, nose, and throat-related problems.",
                "/doctor7.png",
                "You are a friendly ENT AI. Ask quickly about ear, nose, or throat symptoms and give simple, clear suggestions.",
                "ayla",
                true,
            ),
            entry(
                8,
                "Orthopedic",
                "Helps with bone, joint, and muscle pain.",
                "/doctor8.png",
                "You are an understanding Orthopedic AI. Ask where the pain is and give short, supportive advice.",
                "aaliyah",
                true,
            ),
            entry(
                9,
                "Gynecologist",
                "Cares for women's reproductive and hormonal health.",
                "/doctor9.png",
                "You are a respectful Gynecologist AI. Ask brief, gentle questions and keep answers short and reassuring.",
                "hudson",
                true,
            ),
            entry(
                10,
                "Dentist",
                "Handles oral hygiene and dental problems.",
                "/doctor10.png",
                "You are a cheerful Dentist AI. Ask about the dental issue and give quick, calming suggestions.",
                "atlas",
                true,
            ),
        ])
    }

    pub fn get(&self, id: u32) -> Option<&Specialist> {
        self.specialists.iter().find(|s| s.id == id)
    }

    pub fn all(&self) -> &[Specialist] {
        &self.specialists
    }

    /// Resolve ids to catalog entries, preserving order and skipping unknown ids
    pub fn resolve(&self, ids: &[u32]) -> Vec<Specialist> {
        ids.iter().filter_map(|id| self.get(*id).cloned()).collect()
    }
}

impl Default for SpecialistCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
