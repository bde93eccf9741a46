//! LLM-backed query routing.
//!
//! A classifier prompt decides which answer source a query belongs to, and a
//! splitter prompt breaks compound queries into independent sub-questions.
//! Both parse the first JSON object out of the model's reply and fall back
//! to safe defaults when the model misbehaves — routing never errors out.

use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use sibyl_core::{ChatModel, ChatRequest, Message, QueryType, RouterDecision};

const ROUTE_PROMPT: &str = r#"You are a query router. Classify the user input into exactly one category based on the source best suited to answer it:
1. "DOCS_QUERY": the query can be answered from the product documentation corpus (APIs, models, usage guidelines, tooling).
2. "REPORTS_QUERY": the query concerns the structured report corpus (annual reports, datasets, financial or research documents).
3. "WEB_QUERY": the query fits neither corpus, or it needs current external information (news, trends, comparisons across vendors).

Decide by the domain of the query alone.

Always respond with valid JSON in this shape:
{
    "action": "DOCS_QUERY" or "REPORTS_QUERY" or "WEB_QUERY",
    "reason": "brief justification",
    "answer": "AT MAX 5 words. Leave empty for WEB_QUERY"
}

EXAMPLES:

- User: "How do I fine-tune the base model?"
Response:
{
    "action": "DOCS_QUERY",
    "reason": "Fine-tuning is covered by the documentation",
    "answer": "Use the fine-tuning API"
}

- User: "Where can I find revenue figures for the last 10 years?"
Response:
{
    "action": "REPORTS_QUERY",
    "reason": "Annual report content",
    "answer": "Access the report corpus"
}

- User: "Top leadership styles in 2024"
Response:
{
    "action": "WEB_QUERY",
    "reason": "Needs current external information",
    "answer": ""
}

Strictly follow this format for every query, and never deviate."#;

const SPLIT_PROMPT: &str = r#"You are an expert query analyzer. Decide whether the user query contains multiple distinct information needs; if so, break it into focused sub-questions that can be answered independently.

RULES:
1. A single focused question is returned as-is.
2. Multiple distinct needs become separate sub-questions.
3. Each sub-question must be self-contained and answerable on its own.
4. Preserve the original intent and context of each question.
5. Comparisons become one question per entity being compared.

EXAMPLES:

Query: "What was the revenue of Lyft in 2024?"
Response: {"subQuestions": ["What was the revenue of Lyft in 2024?"]}

Query: "What was the revenue of Lyft in 2024 and what was Uber's revenue in 2021?"
Response: {"subQuestions": ["What was the revenue of Lyft in 2024?", "What was Uber's revenue in 2021?"]}

Query: "Compare the financial performance of Apple and Microsoft, and also tell me about the latest AI developments"
Response: {"subQuestions": ["What is the financial performance of Apple?", "What is the financial performance of Microsoft?", "What are the latest AI developments?"]}

Return ONLY a valid JSON object in this exact format:
{"subQuestions": ["question1", "question2", ...]}"#;

/// Sub-questions that were too short to be meaningful are dropped.
const MIN_SUB_QUESTION_LEN: usize = 10;

#[derive(Debug, Deserialize)]
struct SubQuerySplit {
    #[serde(rename = "subQuestions")]
    sub_questions: Vec<String>,
}

/// Routes queries to an answer source and divides compound queries,
/// delegating the judgment calls to a chat model.
pub struct QueryRouter {
    model: Arc<dyn ChatModel>,
    json_block: Regex,
    first_json_block: Regex,
}

impl QueryRouter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            // Greedy: from the first '{' to the last '}' of the reply.
            json_block: Regex::new(r"(?s)\{.*\}").expect("valid regex"),
            // Lazy: the first balanced-looking object only.
            first_json_block: Regex::new(r"(?s)\{.*?\}").expect("valid regex"),
        }
    }

    /// Classify `query` into one of the three answer sources.
    ///
    /// Model failures and unparseable replies fall back to [`QueryType::Web`]
    /// with the failure recorded in the decision's `reason`.
    pub async fn route(&self, query: &str) -> RouterDecision {
        let request = ChatRequest::new(vec![
            Message::system(ROUTE_PROMPT),
            Message::human(query),
        ]);

        let reply = match self.model.chat(request).await {
            Ok(response) => response.message.content().to_string(),
            Err(e) => {
                tracing::error!(error = %e, query, "router model call failed");
                return fallback_decision(format!("model error: {e}"));
            }
        };

        let Some(json_text) = self.json_block.find(&reply).map(|m| m.as_str()) else {
            tracing::error!(query, "no JSON object in router reply");
            return fallback_decision("failed to parse router response".to_string());
        };

        match serde_json::from_str::<RouterDecision>(json_text) {
            Ok(decision) => {
                tracing::info!(action = %decision.action, reason = %decision.reason, "query routed");
                decision
            }
            Err(e) => {
                tracing::error!(error = %e, query, "malformed JSON in router reply");
                fallback_decision(format!("JSON parsing error: {e}"))
            }
        }
    }

    /// Divide a compound query into independently answerable sub-questions.
    ///
    /// Returns the original query as the only element when division fails or
    /// produces nothing usable.
    pub async fn split(&self, query: &str) -> Vec<String> {
        let request = ChatRequest::new(vec![
            Message::system(SPLIT_PROMPT),
            Message::human(query),
        ]);

        let reply = match self.model.chat(request).await {
            Ok(response) => response.message.content().to_string(),
            Err(e) => {
                tracing::error!(error = %e, query, "sub-query model call failed");
                return vec![query.to_string()];
            }
        };

        if let Some(json_text) = self.first_json_block.find(&reply).map(|m| m.as_str()) {
            if let Ok(split) = serde_json::from_str::<SubQuerySplit>(json_text) {
                let valid: Vec<String> = split
                    .sub_questions
                    .into_iter()
                    .map(|q| q.trim().to_string())
                    .filter(|q| q.len() > MIN_SUB_QUESTION_LEN)
                    .collect();
                if !valid.is_empty() {
                    tracing::info!(count = valid.len(), "query divided into sub-questions");
                    return valid;
                }
            }
        }

        tracing::warn!(query, "failed to parse sub-query reply, keeping original query");
        vec![query.to_string()]
    }
}

fn fallback_decision(reason: String) -> RouterDecision {
    RouterDecision {
        action: QueryType::Web,
        reason,
        answer: String::new(),
    }
}
