//! Marketplace API payload types

use serde::Deserialize;

/// State marking a question as new and unanswered (not yet rejected)
pub const NEW_QUESTION_STATE: &str = "suppliersPortalSynch";

/// Product reference attached to a feedback
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetails {
    #[serde(rename = "nmId")]
    pub nm_id: i64,
}

/// A buyer feedback (review with a product mark)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub pros: Option<String>,
    #[serde(default)]
    pub cons: Option<String>,
    /// Preset tags attached instead of (or alongside) free text
    #[serde(default)]
    pub bables: Option<Vec<String>>,
    #[serde(default)]
    pub photo_links: Option<serde_json::Value>,
    #[serde(default)]
    pub video: Option<serde_json::Value>,
    pub created_date: String,
    /// Product mark, 1..=5
    pub product_valuation: i64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub subject_name: String,
    pub product_details: ProductDetails,
}

impl Feedback {
    /// Collapse the structured review parts into one text block
    pub fn combined_text(&self) -> String {
        let mut out = String::new();
        if let Some(pros) = self.pros.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("Pros: {pros}\n"));
        }
        if let Some(cons) = self.cons.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("Cons: {cons}\n"));
        }
        if let Some(text) = self.text.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("Comment: {text}\n"));
        }
        if let Some(tags) = self.bables.as_ref().filter(|t| !t.is_empty()) {
            out.push_str(&format!("Tags: {}\n", tags.join(", ")));
        }
        if self.has_media() {
            out.push_str("Photos or video attached\n");
        }
        out.truncate(out.trim_end_matches('\n').len());
        out
    }

    /// Whether the buyer attached photos or video
    pub fn has_media(&self) -> bool {
        let non_empty = |v: &serde_json::Value| match v {
            serde_json::Value::Null => false,
            serde_json::Value::Array(a) => !a.is_empty(),
            _ => true,
        };
        self.photo_links.as_ref().is_some_and(non_empty) || self.video.as_ref().is_some_and(non_empty)
    }
}

/// A buyer question (no product mark)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub created_date: String,
    #[serde(default)]
    pub state: String,
}

/// What a reply is being composed for.
///
/// Decided once when the record is fetched; replaces ad hoc "does it carry a
/// mark" inspection at every use site.
#[derive(Debug, Clone)]
pub enum ReviewRecord {
    Feedback(Feedback),
    Question(Question),
}

impl ReviewRecord {
    /// Provider-side id of the underlying record
    pub fn id(&self) -> &str {
        match self {
            ReviewRecord::Feedback(fb) => &fb.id,
            ReviewRecord::Question(q) => &q.id,
        }
    }

    /// Creation date of the underlying record
    pub fn created_date(&self) -> &str {
        match self {
            ReviewRecord::Feedback(fb) => &fb.created_date,
            ReviewRecord::Question(q) => &q.created_date,
        }
    }
}

/// Publication state for a question answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState {
    /// Decline to answer
    Rejected,
    /// Publish the answer
    Published,
}

impl AnswerState {
    /// Wire value expected by the questions endpoint
    pub fn as_wire(&self) -> &'static str {
        match self {
            AnswerState::Rejected => "none",
            AnswerState::Published => "wbRu",
        }
    }
}

/// One product card from the content API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(rename = "nmID")]
    pub nm_id: i64,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Feedbacks list envelope
#[derive(Debug, Deserialize)]
pub struct FeedbacksResponse {
    pub data: FeedbacksData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbacksData {
    pub count_unanswered: u64,
    #[serde(default)]
    pub feedbacks: Vec<Feedback>,
}

/// Questions list envelope
#[derive(Debug, Deserialize)]
pub struct QuestionsResponse {
    pub data: QuestionsData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsData {
    pub count_unanswered: u64,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Cards list envelope
#[derive(Debug, Deserialize)]
pub struct CardsResponse {
    #[serde(default)]
    pub cards: Vec<Card>,
    pub cursor: CardsCursor,
}

/// Provider-side cursor accompanying a cards page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsCursor {
    pub total: u64,
    #[serde(default)]
    pub nm_id: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
