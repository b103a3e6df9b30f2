//! Typed client for the marketplace review platform
//!
//! Feedbacks and questions are paged with take/skip off the reported
//! unanswered count; the product card catalog is drained through the cursor
//! pager. Every call goes through the shared [`RequestExecutor`].

mod types;

pub use types::{
    AnswerState, Card, CardsCursor, CardsResponse, Feedback, FeedbacksData, FeedbacksResponse, NEW_QUESTION_STATE,
    ProductDetails, Question, QuestionsData, QuestionsResponse, ReviewRecord,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::executor::{ProviderProfile, RequestDescriptor, RequestExecutor};
use crate::pager::{CursorPos, Page, PagedResult, drain_pages};

/// Marketplace endpoints and paging limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Feedbacks/questions API base URL
    #[serde(rename = "feedbacks-base-url")]
    pub feedbacks_base_url: String,

    /// Content (cards) API base URL
    #[serde(rename = "content-base-url")]
    pub content_base_url: String,

    /// Page size for feedback fetches
    #[serde(rename = "feedback-take")]
    pub feedback_take: u32,

    /// Page size for question fetches
    #[serde(rename = "question-take")]
    pub question_take: u32,

    /// Page limit for the cursor-paged card catalog
    #[serde(rename = "card-limit")]
    pub card_limit: u32,

    /// Response classification for this provider
    pub profile: ProviderProfile,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            feedbacks_base_url: "https://feedbacks-api.wildberries.ru".to_string(),
            content_base_url: "https://content-api.wildberries.ru".to_string(),
            feedback_take: 5_000,
            question_take: 10_000,
            card_limit: 100,
            profile: ProviderProfile::named("marketplace"),
        }
    }
}

/// Per-job marketplace client; cheap to build, the executor is shared
pub struct MarketplaceClient {
    executor: Arc<RequestExecutor>,
    config: MarketplaceConfig,
    token: String,
}

impl MarketplaceClient {
    /// Create a client authenticating with the given job token
    pub fn new(executor: Arc<RequestExecutor>, config: MarketplaceConfig, token: impl Into<String>) -> Self {
        Self {
            executor,
            config,
            token: token.into(),
        }
    }

    fn get(&self, path: &str, label: &str) -> RequestDescriptor {
        RequestDescriptor::get(format!("{}{path}", self.config.feedbacks_base_url))
            .header("Authorization", self.token.clone())
            .timeout(self.executor.call_timeout())
            .label(label)
    }

    fn send_json(&self, descriptor: RequestDescriptor, body: serde_json::Value) -> RequestDescriptor {
        descriptor.header("Content-Type", "application/json").json(body)
    }

    async fn feedback_page(&self, take: u32, skip: u64) -> Result<FeedbacksData, ProviderError> {
        let descriptor = self
            .get("/api/v1/feedbacks", "GET feedbacks")
            .query("isAnswered", "false")
            .query("take", take.to_string())
            .query("skip", skip.to_string());

        let response: FeedbacksResponse = self.executor.execute(&descriptor).await.into_result()?.json()?;
        Ok(response.data)
    }

    /// Fetch all currently unanswered feedbacks
    pub async fn unanswered_feedbacks(&self) -> Result<Vec<Feedback>, ProviderError> {
        let take = self.config.feedback_take;
        let first = self.feedback_page(take, 0).await?;
        let total = first.count_unanswered;
        debug!(total, "MarketplaceClient::unanswered_feedbacks: unanswered count");

        let mut out = first.feedbacks;
        let mut skip = take as u64;
        while (out.len() as u64) < total {
            let page = self.feedback_page(take, skip).await?;
            if page.feedbacks.is_empty() {
                break;
            }
            out.extend(page.feedbacks);
            skip += take as u64;
        }
        Ok(out)
    }

    async fn question_page(&self, take: u32, skip: u64) -> Result<QuestionsData, ProviderError> {
        let descriptor = self
            .get("/api/v1/questions", "GET questions")
            .query("isAnswered", "false")
            .query("take", take.to_string())
            .query("skip", skip.to_string());

        let response: QuestionsResponse = self.executor.execute(&descriptor).await.into_result()?.json()?;
        Ok(response.data)
    }

    /// Fetch unanswered questions still in the new-question state
    pub async fn unanswered_questions(&self) -> Result<Vec<Question>, ProviderError> {
        let take = self.config.question_take;
        let first = self.question_page(take, 0).await?;
        let total = first.count_unanswered;
        debug!(total, "MarketplaceClient::unanswered_questions: unanswered count");

        let mut out = first.questions;
        let mut skip = take as u64;
        while (out.len() as u64) < total {
            let page = self.question_page(take, skip).await?;
            if page.questions.is_empty() {
                break;
            }
            out.extend(page.questions);
            skip += take as u64;
        }

        out.retain(|q| q.state == NEW_QUESTION_STATE);
        Ok(out)
    }

    /// Publish a reply to a feedback
    pub async fn answer_feedback(&self, feedback_id: &str, reply: &str) -> Result<(), ProviderError> {
        let descriptor = self.send_json(
            RequestDescriptor::post(format!("{}/api/v1/feedbacks/comments", self.config.feedbacks_base_url))
                .header("Authorization", self.token.clone())
                .timeout(self.executor.call_timeout())
                .label("POST feedback comment"),
            serde_json::json!({ "id": feedback_id, "text": reply }),
        );

        self.executor.execute(&descriptor).await.into_result()?;
        Ok(())
    }

    /// Publish (or reject) an answer to a question
    pub async fn answer_question(&self, question_id: &str, reply: &str, state: AnswerState) -> Result<(), ProviderError> {
        let descriptor = self.send_json(
            RequestDescriptor::patch(format!("{}/api/v1/questions", self.config.feedbacks_base_url))
                .header("Authorization", self.token.clone())
                .timeout(self.executor.call_timeout())
                .label("PATCH question answer"),
            serde_json::json!({
                "id": question_id,
                "answer": { "text": reply },
                "state": state.as_wire(),
            }),
        );

        self.executor.execute(&descriptor).await.into_result()?;
        Ok(())
    }

    async fn card_page(&self, cursor: crate::pager::PageCursor) -> Result<Page<Card>, ProviderError> {
        let mut cursor_body = serde_json::json!({ "limit": cursor.limit });
        if let Some(last_id) = &cursor.last_id {
            cursor_body["nmID"] = last_id.clone();
        }
        if let Some(updated_at) = &cursor.updated_at {
            cursor_body["updatedAt"] = serde_json::json!(updated_at);
        }

        let body = serde_json::json!({
            "settings": {
                "cursor": cursor_body,
                "sort": { "ascending": false },
                "filter": {
                    "textSearch": "",
                    "withPhoto": -1,
                    "allowedStatuses": [],
                    "objectIDs": [],
                    "brandNames": [],
                    "tagIDs": []
                }
            }
        });

        let descriptor = self.send_json(
            RequestDescriptor::post(format!("{}/content/v2/get/cards/list", self.config.content_base_url))
                .header("Authorization", self.token.clone())
                .timeout(self.executor.call_timeout())
                .label("POST cards list"),
            body,
        );

        let response: CardsResponse = self.executor.execute(&descriptor).await.into_result()?.json()?;

        let next = match (&response.cursor.nm_id, &response.cursor.updated_at) {
            (Some(nm_id), Some(updated_at)) => Some(CursorPos {
                last_id: serde_json::json!(nm_id),
                updated_at: updated_at.clone(),
            }),
            _ => None,
        };

        Ok(Page {
            items: response.cards,
            total: response.cursor.total,
            next,
        })
    }

    /// Drain the full product card catalog through the cursor pager.
    ///
    /// A mid-walk failure yields the cards collected so far; the caller
    /// decides whether a partial catalog is usable.
    pub async fn catalog(&self) -> PagedResult<Card> {
        drain_pages(self.config.card_limit, |cursor| self.card_page(cursor)).await
    }
}

/// Fold cards into a compact article catalog for prompt embedding
pub fn catalog_json(cards: &[Card]) -> String {
    let entries: Vec<serde_json::Value> = cards
        .iter()
        .map(|card| {
            serde_json::json!({
                "nm_id": card.nm_id,
                "subject_name": card.subject_name,
                "title": card.title,
                "description": card.description,
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}
