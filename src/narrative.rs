//! Narrative report generation.
//!
//! A [`ReportGenerator`] turns computed metrics into free text. The concrete
//! strategy is picked once at startup by [`from_config`]: an OpenAI-compatible
//! chat completions backend when an API key is configured, otherwise the
//! offline [`TemplateReportGenerator`].

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DiagnosticResult, DisciplineLevel};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 600;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

const SYSTEM_PROMPT: &str = "You are a blunt financial and productivity coach. \
     Give the user a brutally honest diagnosis of where they stand today and a \
     specific action plan to change their reality over the next five years. \
     Use strong, motivating language without euphemisms.";

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("report request failed: {0}")]
    Request(String),

    #[error("report backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse report response: {0}")]
    Parse(String),
}

pub trait ReportGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, metrics: &DiagnosticResult) -> Result<String, NarrativeError>;
}

#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

pub fn from_config(config: &NarrativeConfig) -> Arc<dyn ReportGenerator> {
    match config.api_key.as_deref().filter(|key| !key.trim().is_empty()) {
        Some(key) => {
            tracing::info!(model = %config.model, "narrative reports use the language model backend");
            Arc::new(LlmReportGenerator::new(config.clone(), key))
        }
        None => {
            tracing::info!("no API key configured, narrative reports use the offline template");
            Arc::new(TemplateReportGenerator)
        }
    }
}

pub fn build_prompt(d: &DiagnosticResult) -> String {
    let level = DisciplineLevel::from_score(d.discipline_score);
    let mut prompt = String::new();

    let _ = writeln!(prompt, "User diagnostic:");
    let _ = writeln!(prompt, "- Monthly income: {}", d.input.monthly_income);
    let _ = writeln!(prompt, "- Monthly impulsive spending: {}", d.input.monthly_impulsive_spending);
    let _ = writeln!(prompt, "- Hours wasted per day: {}h", d.input.hours_wasted_per_day);
    let _ = writeln!(prompt, "- Hours studying per day: {}h", d.input.hours_studying_per_day);
    let _ = writeln!(prompt, "- Discipline score: {}/100 ({})", d.discipline_score, level);
    let _ = writeln!(prompt, "- Hours wasted over 5 years: {}h", d.five_year_wasted_hours);
    let _ = writeln!(prompt, "- Money wasted over 5 years: {}", d.five_year_money_wasted);
    let _ = writeln!(
        prompt,
        "- Projected monthly income in 5 years WITHOUT change: {:.0}",
        d.projected_income_if_unchanged
    );
    let _ = writeln!(
        prompt,
        "- Projected monthly income in 5 years WITH discipline: {:.0}",
        d.projected_income_if_disciplined
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Write a brutally honest diagnostic report in 3 paragraphs:");
    let _ = writeln!(prompt, "1. The current reality, without softening it");
    let _ = writeln!(prompt, "2. The cost of changing nothing");
    let _ = write!(
        prompt,
        "3. What discipline makes possible, with a concrete action plan"
    );

    prompt
}

/// Offline narrative built only from the computed metrics.
pub struct TemplateReportGenerator;

impl ReportGenerator for TemplateReportGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    fn generate(&self, d: &DiagnosticResult) -> Result<String, NarrativeError> {
        Ok(template_report(d))
    }
}

pub fn template_report(d: &DiagnosticResult) -> String {
    let level = DisciplineLevel::from_score(d.discipline_score);
    let mut report = String::new();

    let _ = writeln!(report, "**Your Current Reality**");
    match level {
        DisciplineLevel::High | DisciplineLevel::Moderate => {
            let _ = writeln!(
                report,
                "A discipline score of {}/100 ({}) puts you ahead of most people, but discipline \
                 without strategy is just habit. Every day you still lose {} hour(s) and {:.0} to \
                 impulse is a day you do not get back.",
                d.discipline_score,
                level.label().to_lowercase(),
                d.input.hours_wasted_per_day,
                d.input.monthly_impulsive_spending
            );
        }
        DisciplineLevel::Weak | DisciplineLevel::None => {
            let _ = writeln!(
                report,
                "With a discipline score of {}/100 ({}) you are operating well below your \
                 potential. Every day spent wasting {} hour(s) and spending {:.0} a month on \
                 impulse is a day you will not recover. There is no way to soften this.",
                d.discipline_score,
                level.label().to_lowercase(),
                d.input.hours_wasted_per_day,
                d.input.monthly_impulsive_spending
            );
        }
    }

    let _ = writeln!(report);
    let _ = writeln!(report, "**The Cost of Not Changing**");
    let _ = writeln!(
        report,
        "Over 5 years you will waste {:.0} hours, time that could have gone into skills, a \
         business or relationships that build real wealth. Another {:.0} will evaporate in \
         impulsive purchases. Your monthly income in year 5 will be only {:.0}, barely \
         different from today.",
        d.five_year_wasted_hours, d.five_year_money_wasted, d.projected_income_if_unchanged
    );

    let _ = writeln!(report);
    let _ = writeln!(report, "**What Discipline Buys You**");
    let _ = write!(
        report,
        "Study more, cut the waste and stop buying on impulse, and your income can reach {:.0} \
         a month in 5 years. That is {:.0} more every month. The question is not whether you \
         can. It is whether you start today.",
        d.projected_income_if_disciplined,
        d.income_gap()
    );

    report
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
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

/// Chat completions client for OpenAI-compatible backends.
pub struct LlmReportGenerator {
    config: NarrativeConfig,
    api_key: String,
    agent: ureq::Agent,
}

fn make_agent() -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(60)))
        .build()
        .new_agent()
}

impl LlmReportGenerator {
    pub fn new(config: NarrativeConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            agent: make_agent(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

impl ReportGenerator for LlmReportGenerator {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn generate(&self, metrics: &DiagnosticResult) -> Result<String, NarrativeError> {
        let prompt = build_prompt(metrics);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .agent
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(&body)
            .map_err(|e| NarrativeError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| NarrativeError::Request(e.to_string()))?;

        read_completion(status, &text, metrics)
    }
}

/// Maps a chat completions reply to report text. Error statuses and
/// unparseable bodies are errors; a missing or blank completion falls back
/// to the template.
fn read_completion(
    status: u16,
    body: &str,
    metrics: &DiagnosticResult,
) -> Result<String, NarrativeError> {
    if status >= 400 {
        return Err(NarrativeError::Api {
            status,
            message: body.to_string(),
        });
    }

    let resp: ChatResponse =
        serde_json::from_str(body).map_err(|e| NarrativeError::Parse(e.to_string()))?;

    Ok(completion_or_template(resp, metrics))
}

fn completion_or_template(resp: ChatResponse, metrics: &DiagnosticResult) -> String {
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty());

    match content {
        Some(text) => text,
        None => {
            tracing::warn!("empty completion, using template report");
            template_report(metrics)
        }
    }
}
