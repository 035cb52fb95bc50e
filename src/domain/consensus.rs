//! AI Votes and Consensus
//!
//! Pure aggregation of provider votes. Absence of enough usable votes is
//! never actionable: the result is forced to hold.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::signal::Action;

/// A single provider's recommendation for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVote {
    pub provider_id: String,
    pub action: Action,
    /// Confidence 0.0 - 1.0
    pub confidence: f64,
    pub suggested_amount_sol: f64,
    pub reasoning: String,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl AiVote {
    /// Vote recorded for a provider that errored or timed out
    pub fn failed(provider_id: &str, error: String, latency_ms: u64) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            action: Action::Hold,
            confidence: 0.0,
            suggested_amount_sol: 0.0,
            reasoning: String::new(),
            latency_ms,
            error: Some(error),
        }
    }

    pub fn is_usable(&self) -> bool {
        self.error.is_none() && self.confidence.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub action: Action,
    /// Mean confidence of the votes backing `action` (0.0 - 1.0)
    pub confidence: f64,
    /// Usable votes that were counted
    pub vote_count: usize,
    /// Providers skipped (breaker open) or dropped at the cycle deadline
    pub absent: usize,
    pub votes: Vec<AiVote>,
    /// Quorum was reached
    pub actionable: bool,
}

impl ConsensusResult {
    /// Result used when no votes could be collected
    pub fn empty(absent: usize) -> Self {
        Self {
            action: Action::Hold,
            confidence: 0.0,
            vote_count: 0,
            absent,
            votes: Vec::new(),
            actionable: false,
        }
    }

    /// All providers were silent
    pub fn is_exhausted(&self) -> bool {
        self.vote_count == 0
    }

    pub fn is_sell_with(&self, min_confidence: f64) -> bool {
        self.actionable && self.action == Action::Sell && self.confidence >= min_confidence
    }

    pub fn is_buy_with(&self, min_confidence: f64) -> bool {
        self.actionable && self.action == Action::Buy && self.confidence >= min_confidence
    }

    /// Mean amount suggested by the winning voters
    pub fn suggested_amount_sol(&self) -> Option<f64> {
        let backing: Vec<f64> = self
            .votes
            .iter()
            .filter(|v| v.is_usable() && v.action == self.action && v.suggested_amount_sol > 0.0)
            .map(|v| v.suggested_amount_sol)
            .collect();
        if backing.is_empty() {
            None
        } else {
            Some(backing.iter().sum::<f64>() / backing.len() as f64)
        }
    }
}

/// Aggregate votes into a consensus.
///
/// Plurality wins; ties go to the action of the single most confident vote
/// among the tied actions. Fewer than `min_quorum` usable votes yields hold.
pub fn aggregate(votes: Vec<AiVote>, absent: usize, min_quorum: usize) -> ConsensusResult {
    let usable: Vec<&AiVote> = votes.iter().filter(|v| v.is_usable()).collect();
    let vote_count = usable.len();

    if vote_count == 0 || vote_count < min_quorum {
        tracing::debug!(
            "Consensus below quorum: {} usable votes, {} required",
            vote_count,
            min_quorum
        );
        return ConsensusResult {
            action: Action::Hold,
            confidence: 0.0,
            vote_count,
            absent,
            votes,
            actionable: false,
        };
    }

    let mut tally: HashMap<Action, Vec<f64>> = HashMap::new();
    for vote in &usable {
        tally.entry(vote.action).or_default().push(vote.confidence);
    }

    let top = tally.values().map(Vec::len).max().unwrap_or(0);
    let tied: Vec<Action> = tally
        .iter()
        .filter(|(_, c)| c.len() == top)
        .map(|(a, _)| *a)
        .collect();

    let winner = if tied.len() == 1 {
        tied[0]
    } else {
        usable
            .iter()
            .filter(|v| tied.contains(&v.action))
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|v| v.action)
            .unwrap_or(Action::Hold)
    };

    let backing = &tally[&winner];
    let confidence = backing.iter().sum::<f64>() / backing.len() as f64;

    ConsensusResult {
        action: winner,
        confidence,
        vote_count,
        absent,
        votes,
        actionable: true,
    }
}
