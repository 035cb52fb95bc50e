use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};

use crate::domain::{Action, AiVote, TokenCandidate};
use crate::ports::{AiProvider, ProviderError, ProviderTier};

const SYSTEM_PROMPT: &str = "You are a Solana token trading analyst. Reply with a single JSON object: \
{\"action\": \"buy\"|\"sell\"|\"hold\", \"confidence\": 0-1, \"amount_sol\": number, \"reasoning\": string}";

/// Connection settings for one chat-completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub id: String,
    pub tier: ProviderTier,
    pub priority: u32,
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Provider speaking the OpenAI-compatible chat-completions protocol
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    http: Client,
    settings: ProviderSettings,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct VotePayload {
    action: String,
    confidence: f64,
    #[serde(default, alias = "amountSol", alias = "suggested_amount_sol")]
    amount_sol: f64,
    #[serde(default)]
    reasoning: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(settings: ProviderSettings, api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { http, settings, api_key })
    }

    fn prompt(candidate: &TokenCandidate, risk_tolerance: f64, budget_sol: f64) -> String {
        let metric = |v: Option<f64>| v.map(|x| format!("{:.4}", x)).unwrap_or_else(|| "unknown".into());
        format!(
            "Token {} ({})\nprice_sol: {}\nvolume_24h_usd: {}\nliquidity_usd: {}\nchange_1h_pct: {}\n\
             change_24h_pct: {}\norganic_score: {}\nquality_score: {}\nage_hours: {}\n\
             risk_tolerance: {:.2}\nbudget_sol: {:.4}",
            candidate.symbol,
            candidate.mint,
            metric(candidate.price_sol),
            metric(candidate.volume_24h_usd),
            metric(candidate.liquidity_usd),
            metric(candidate.price_change_1h),
            metric(candidate.price_change_24h),
            metric(candidate.organic_score),
            metric(candidate.quality_score),
            metric(candidate.estimated_age_hours),
            risk_tolerance,
            budget_sol,
        )
    }
}

/// Parse the model's reply into a vote.
///
/// The JSON object may be wrapped in prose or code fences. Confidence above
/// 1 is read as a percentage.
pub fn parse_vote(provider_id: &str, content: &str, latency_ms: u64) -> Result<AiVote, ProviderError> {
    let start = content
        .find('{')
        .ok_or_else(|| ProviderError::InvalidResponse("no JSON object in reply".into()))?;
    let end = content
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ProviderError::InvalidResponse("unterminated JSON object".into()))?;

    let payload: VotePayload = serde_json::from_str(&content[start..=end])
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let action = Action::parse(&payload.action).ok_or_else(|| ProviderError::UnknownAction(payload.action.clone()))?;

    if !payload.confidence.is_finite() || payload.confidence < 0.0 {
        return Err(ProviderError::InvalidResponse(format!("confidence {}", payload.confidence)));
    }
    let confidence = if payload.confidence > 1.0 {
        (payload.confidence / 100.0).min(1.0)
    } else {
        payload.confidence
    };

    Ok(AiVote {
        provider_id: provider_id.to_string(),
        action,
        confidence,
        suggested_amount_sol: payload.amount_sol.max(0.0),
        reasoning: payload.reasoning,
        latency_ms,
        error: None,
    })
}

#[async_trait]
impl AiProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn tier(&self) -> ProviderTier {
        self.settings.tier
    }

    fn priority(&self) -> u32 {
        self.settings.priority
    }

    async fn analyze(
        &self,
        candidate: &TokenCandidate,
        risk_tolerance: f64,
        budget_sol: f64,
    ) -> Result<AiVote, ProviderError> {
        let started = Instant::now();
        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.settings.model,
            "temperature": 0.2,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::prompt(candidate, risk_tolerance, budget_sol)},
            ],
        });

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(started.elapsed().as_millis() as u64)
            } else {
                ProviderError::Http(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            status if !status.is_success() => {
                let text = response.text().await.unwrap_or_default();
                return Err(ProviderError::Http(format!("{}: {}", status, text)));
            }
            _ => {}
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("empty choices".into()))?;

        let vote = parse_vote(&self.settings.id, &content, started.elapsed().as_millis() as u64)?;
        tracing::debug!(
            "{} -> {} {:.0}% for {}",
            self.settings.id,
            vote.action,
            vote.confidence * 100.0,
            candidate.symbol
        );
        Ok(vote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let vote = parse_vote(
            "p",
            r#"{"action":"buy","confidence":0.72,"amount_sol":0.3,"reasoning":"volume"}"#,
            10,
        )
        .unwrap();
        assert_eq!(vote.action, Action::Buy);
        assert_eq!(vote.confidence, 0.72);
        assert_eq!(vote.suggested_amount_sol, 0.3);
        assert!(vote.error.is_none());
    }

    #[test]
    fn test_parse_fenced_percent_confidence() {
        let reply = "Here you go:\n```json\n{\"action\": \"SELL\", \"confidence\": 85, \"reasoning\": \"dump\"}\n```";
        let vote = parse_vote("p", reply, 10).unwrap();
        assert_eq!(vote.action, Action::Sell);
        assert!((vote.confidence - 0.85).abs() < 1e-9);
        assert_eq!(vote.suggested_amount_sol, 0.0);
    }

    #[test]
    fn test_parse_unknown_action() {
        let result = parse_vote("p", r#"{"action":"ape","confidence":0.9}"#, 1);
        assert_eq!(result.unwrap_err(), ProviderError::UnknownAction("ape".into()));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_vote("p", "no idea", 1),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_vote("p", r#"{"action":"buy","confidence":-1}"#, 1),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings: ProviderSettings = toml::from_str(
            r#"
            id = "groq"
            tier = "free_reliable"
            priority = 1
            base_url = "https://api.groq.com/openai/v1"
            model = "llama-3.1-70b"
            api_key_env = "GROQ_API_KEY"
            "#,
        )
        .unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.tier, ProviderTier::FreeReliable);
    }
}
