//! Study assistant backed by an OpenAI-compatible chat completions API.
//!
//! Without an API key, or whenever the upstream call fails, the assistant
//! answers with a fixed study plan built from the student's context.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Assistant as AssistantConfig;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("assistant returned no completion")]
    EmptyCompletion,
}

pub type AssistantResult<T> = std::result::Result<T, AssistantError>;

/// What the assistant knows about the asking student.
#[derive(Debug, Clone, Default)]
pub struct StudyContext {
    pub student_name: Option<String>,
    pub courses: Vec<String>,
    pub next_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StudyAnswer {
    pub source: AnswerSource,
    pub answer: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StudyAssistant {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl StudyAssistant {
    const MAX_TOKENS: u32 = 1024;

    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key().map(str::to_string),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            timeout: config.timeout(),
        }
    }

    /// Assistant that always answers with the fallback plan.
    pub fn offline() -> Self {
        Self::new(&AssistantConfig::default())
    }

    pub async fn help(&self, prompt: &str, context: &StudyContext) -> StudyAnswer {
        let Some(api_key) = self.api_key.as_deref() else {
            return Self::fallback(prompt, context);
        };

        match self.complete(api_key, prompt, context).await {
            Ok(answer) => StudyAnswer {
                source: AnswerSource::Ai,
                answer,
            },
            Err(e) => {
                tracing::warn!("study assistant unavailable, using fallback: {}", e);
                Self::fallback(prompt, context)
            }
        }
    }

    async fn complete(
        &self,
        api_key: &str,
        prompt: &str,
        context: &StudyContext,
    ) -> AssistantResult<String> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: Self::MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: String::from(
                        "You are a helpful study assistant for students in a learning management system. \
                         Give a clear, practical and encouraging answer. Keep it concise.",
                    ),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(prompt, context),
                },
            ],
        };

        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AssistantError::EmptyCompletion)
    }

    pub fn fallback(prompt: &str, context: &StudyContext) -> StudyAnswer {
        StudyAnswer {
            source: AnswerSource::Fallback,
            answer: build_fallback_plan(prompt, context),
        }
    }
}

fn build_user_prompt(prompt: &str, context: &StudyContext) -> String {
    let courses = if context.courses.is_empty() {
        String::from("your enrolled courses")
    } else {
        context.courses.join(", ")
    };
    let next_class = context.next_class.as_deref().unwrap_or("your next class");
    let name = context.student_name.as_deref().unwrap_or("the student");

    format!(
        "Student: {name}\nEnrolled courses: {courses}\nNext class: {next_class}\n\nQuestion: {prompt}"
    )
}

/// Deterministic plan naming up to three courses, the prompt and the next class.
pub fn build_fallback_plan(prompt: &str, context: &StudyContext) -> String {
    let courses = if context.courses.is_empty() {
        String::from("your enrolled courses")
    } else {
        context
            .courses
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let next_class = context
        .next_class
        .as_deref()
        .unwrap_or("your next available study slot");

    format!(
        "Based on {courses}, focus first on the topic related to \"{prompt}\" for 25 minutes. \
         Then review class notes before {next_class}, and finish with 5 practice questions."
    )
}
