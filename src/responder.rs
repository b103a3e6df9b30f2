//! Autoresponder business logic
//!
//! The job behind [`JobKind::Autoresponder`]: drain the product catalog,
//! fetch unanswered feedbacks and questions, compose a reply for each via the
//! assistant, publish it, and append the answered rows to the results sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assistant::AssistantClient;
use crate::executor::RequestExecutor;
use crate::marketplace::{AnswerState, Feedback, MarketplaceClient, MarketplaceConfig, Question, ReviewRecord, catalog_json};
use crate::roster::JobDescriptor;
use crate::runner::JobHandler;

/// Reply returned by the assistant when a question should be declined
pub const REJECTED_REPLY: &str = "REJECTED";

/// Responder tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Max feedbacks answered per cycle
    #[serde(rename = "reply-cap")]
    pub reply_cap: usize,

    /// Optional reply templates embedded in question prompts
    #[serde(rename = "question-templates")]
    pub question_templates: Option<String>,

    /// Attempts to append rows to the results sink
    #[serde(rename = "sink-attempts")]
    pub sink_attempts: u32,

    /// Delay between sink attempts in seconds
    #[serde(rename = "sink-retry-delay-secs")]
    pub sink_retry_delay_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            reply_cap: 100,
            question_templates: None,
            sink_attempts: 3,
            sink_retry_delay_secs: 60,
        }
    }
}

/// Fold an answered record into a sink row; the variant decides the row shape
fn answer_row(record: &ReviewRecord, reply: String) -> AnswerRow {
    match record {
        ReviewRecord::Feedback(fb) => AnswerRow {
            article: Some(fb.product_details.nm_id),
            posted_at: fb.created_date.clone(),
            text: fb.combined_text(),
            mark: Some(fb.product_valuation),
            reply,
            answered_at: Utc::now(),
        },
        ReviewRecord::Question(q) => AnswerRow {
            article: None,
            posted_at: q.created_date.clone(),
            text: q.text.clone(),
            mark: None,
            reply,
            answered_at: Utc::now(),
        },
    }
}

/// One answered record, ready for the results sink
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRow {
    /// Product article, for feedbacks
    pub article: Option<i64>,
    /// When the buyer posted the record
    pub posted_at: String,
    /// The buyer's text
    pub text: String,
    /// Product mark, for feedbacks
    pub mark: Option<i64>,
    /// The published reply
    pub reply: String,
    /// When the reply was sent
    pub answered_at: DateTime<Utc>,
}

/// Destination for answered rows (a spreadsheet in production; kept behind a
/// seam so the core never depends on it)
#[async_trait]
pub trait ResultsSink: Send + Sync {
    /// Append rows for the given job's target
    async fn append(&self, job: &JobDescriptor, sheet: &str, rows: &[AnswerRow]) -> eyre::Result<()>;
}

/// Sink that only logs the rows
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ResultsSink for LogSink {
    async fn append(&self, job: &JobDescriptor, sheet: &str, rows: &[AnswerRow]) -> eyre::Result<()> {
        for row in rows {
            info!(key = %job.key(), sheet, reply = %row.reply, "LogSink::append: answered");
        }
        Ok(())
    }
}

/// Build the prompt for a feedback reply. The catalog is embedded so the
/// model can recommend a similar article (never the purchased one).
fn feedback_prompt(fb: &Feedback, catalog: &str) -> String {
    format!(
        "You are the automatic responder of a marketplace seller. Reply to the buyer's review \
         in their own style (short/detailed, dry/emotional) but always politely and professionally. \
         If the review contains only tags, reply with a standard thank-you. \
         React calmly to negative reviews: thank the buyer for the feedback, give a neutral comment \
         and offer an alternative. \
         Always finish by recommending a similar article from the assortment below (match by type and \
         characteristics); if there is no exact match pick the closest alternative, in the form: \
         \"We also recommend our model: [title] (article: XXXXX)\". \
         Assortment JSON (article is nm_id, name is title): {catalog}\n\
         Review text: {text}\n\
         Review mark: {mark}\n\
         Buyer name: {user} (address them by name if it is a real name)\n\
         Purchased article (do not recommend it back): {article}\n\
         Product type: {subject}",
        catalog = catalog,
        text = fb.combined_text(),
        mark = fb.product_valuation,
        user = fb.user_name,
        article = fb.product_details.nm_id,
        subject = fb.subject_name,
    )
}

/// Build the prompt for a question answer, honoring the REJECTED convention
fn question_prompt(q: &Question, templates: Option<&str>) -> String {
    let template_block = match templates {
        Some(templates) => format!(
            "Answer using the following templates (JSON; when an answer is missing, the last one seen applies): {templates}. "
        ),
        None => String::new(),
    };
    format!(
        "You are the automatic responder of a marketplace seller. Answer the buyer's question. \
         {template_block}If you believe the question should be declined, return the single word {REJECTED_REPLY}; \
         when unsure whether to decline, do not decline. Improvise when needed.\n\
         Question: {text}",
        text = q.text,
    )
}

/// The Autoresponder job: one execution services one client account
pub struct AutoresponderJob {
    executor: Arc<RequestExecutor>,
    marketplace: MarketplaceConfig,
    assistant: Arc<AssistantClient>,
    sink: Arc<dyn ResultsSink>,
    config: ResponderConfig,
}

impl AutoresponderJob {
    /// Create the job handler shared by all roster entries of this kind
    pub fn new(
        executor: Arc<RequestExecutor>,
        marketplace: MarketplaceConfig,
        assistant: Arc<AssistantClient>,
        sink: Arc<dyn ResultsSink>,
        config: ResponderConfig,
    ) -> Self {
        Self {
            executor,
            marketplace,
            assistant,
            sink,
            config,
        }
    }

    fn client(&self, job: &JobDescriptor) -> MarketplaceClient {
        MarketplaceClient::new(self.executor.clone(), self.marketplace.clone(), job.token.clone())
    }

    /// Compose a reply for a record; dispatch on the record variant decides
    /// the prompt shape.
    async fn compose(&self, record: &ReviewRecord, catalog: &str) -> Result<String, crate::error::ProviderError> {
        let prompt = match record {
            ReviewRecord::Feedback(fb) => feedback_prompt(fb, catalog),
            ReviewRecord::Question(q) => question_prompt(q, self.config.question_templates.as_deref()),
        };
        self.assistant.complete(&prompt).await
    }

    async fn answer_feedbacks(&self, job: &JobDescriptor, client: &MarketplaceClient, catalog: &str) -> eyre::Result<()> {
        let feedbacks = client.unanswered_feedbacks().await?;
        info!(key = %job.key(), count = feedbacks.len(), "AutoresponderJob: unanswered feedbacks");

        let mut rows = Vec::new();
        for fb in feedbacks.into_iter().take(self.config.reply_cap) {
            let record = ReviewRecord::Feedback(fb);
            let reply = self.compose(&record, catalog).await?;
            if reply.is_empty() {
                warn!(key = %job.key(), id = %record.id(), "AutoresponderJob: empty reply, skipping feedback");
                continue;
            }

            match client.answer_feedback(record.id(), &reply).await {
                Ok(()) => {
                    debug!(key = %job.key(), id = %record.id(), "AutoresponderJob: feedback answered");
                    rows.push(answer_row(&record, reply));
                }
                Err(e) => {
                    // A failed publish skips this record; the feedback stays
                    // unanswered and is picked up again next cycle
                    warn!(key = %job.key(), id = %record.id(), error = %e, "AutoresponderJob: failed to answer feedback");
                }
            }
        }

        if !rows.is_empty() {
            self.append_rows(job, "feedbacks", &rows).await;
        }
        Ok(())
    }

    async fn answer_questions(&self, job: &JobDescriptor, client: &MarketplaceClient) -> eyre::Result<()> {
        let questions = client.unanswered_questions().await?;
        info!(key = %job.key(), count = questions.len(), "AutoresponderJob: unanswered questions");

        let mut rows = Vec::new();
        for q in questions {
            let record = ReviewRecord::Question(q);
            let reply = self.compose(&record, "").await?;
            if reply.is_empty() {
                warn!(key = %job.key(), id = %record.id(), "AutoresponderJob: empty reply, skipping question");
                continue;
            }

            let state = if reply == REJECTED_REPLY {
                AnswerState::Rejected
            } else {
                AnswerState::Published
            };

            match client.answer_question(record.id(), &reply, state).await {
                Ok(()) => {
                    debug!(key = %job.key(), id = %record.id(), ?state, "AutoresponderJob: question answered");
                    rows.push(answer_row(&record, reply));
                }
                Err(e) => {
                    warn!(key = %job.key(), id = %record.id(), error = %e, "AutoresponderJob: failed to answer question");
                }
            }
        }

        if !rows.is_empty() {
            self.append_rows(job, "questions", &rows).await;
        }
        Ok(())
    }

    /// Append rows with bounded retries; sink failures never fail the cycle,
    /// the replies are already published.
    async fn append_rows(&self, job: &JobDescriptor, sheet: &str, rows: &[AnswerRow]) {
        for attempt in 1..=self.config.sink_attempts {
            match self.sink.append(job, sheet, rows).await {
                Ok(()) => {
                    info!(key = %job.key(), sheet, count = rows.len(), "AutoresponderJob: rows appended");
                    return;
                }
                Err(e) => {
                    warn!(
                        key = %job.key(),
                        sheet,
                        attempt,
                        max = self.config.sink_attempts,
                        error = %e,
                        "AutoresponderJob: sink append failed"
                    );
                    if attempt < self.config.sink_attempts {
                        tokio::time::sleep(Duration::from_secs(self.config.sink_retry_delay_secs)).await;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl JobHandler for AutoresponderJob {
    async fn execute(&self, job: &JobDescriptor) -> eyre::Result<()> {
        info!(key = %job.key(), client = %job.name, "AutoresponderJob::execute: starting cycle");
        let client = self.client(job);

        // A partial catalog still serves recommendations; only a completely
        // failed walk aborts the cycle
        let catalog_walk = client.catalog().await;
        if let Some(failure) = &catalog_walk.failure {
            if catalog_walk.items.is_empty() {
                return Err(eyre::eyre!("catalog unavailable: {failure}"));
            }
            warn!(key = %job.key(), cards = catalog_walk.items.len(), error = %failure, "AutoresponderJob::execute: using partial catalog");
        }
        let catalog = catalog_json(&catalog_walk.items);

        self.answer_feedbacks(job, &client, &catalog).await?;
        self.answer_questions(job, &client).await?;

        info!(key = %job.key(), "AutoresponderJob::execute: cycle complete");
        Ok(())
    }
}
