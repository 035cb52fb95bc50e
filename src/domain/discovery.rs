//! Token Discovery Filter
//!
//! Quality gate applied to the raw candidate list. Pure predicate + sort.

use std::cmp::Ordering;

use super::blacklist::Blacklist;
use super::strategy_config::HivemindStrategyConfig;
use super::token::TokenCandidate;

/// Why a candidate failed the quality gate
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRejection {
    Blacklisted,
    MissingMarketData,
    LowVolume(f64),
    LowLiquidity(f64),
    TooYoung(f64),
    FewHolders(u64),
    LowOrganicScore(f64),
    LowQualityScore(f64),
}

/// Check a single candidate against the gate.
///
/// Volume and liquidity are mandatory. Age, holders and scores only reject
/// when present and below threshold.
pub fn check_candidate(
    token: &TokenCandidate,
    config: &HivemindStrategyConfig,
    blacklist: &Blacklist,
) -> Result<(), FilterRejection> {
    if blacklist.contains(&token.mint) {
        return Err(FilterRejection::Blacklisted);
    }

    let (volume, liquidity) = match (token.volume_24h_usd, token.liquidity_usd) {
        (Some(v), Some(l)) => (v, l),
        _ => return Err(FilterRejection::MissingMarketData),
    };

    if volume < config.min_volume_usd {
        return Err(FilterRejection::LowVolume(volume));
    }
    if liquidity < config.min_liquidity_usd {
        return Err(FilterRejection::LowLiquidity(liquidity));
    }
    if let Some(age) = token.estimated_age_hours {
        if age < config.min_age_hours {
            return Err(FilterRejection::TooYoung(age));
        }
    }
    if let Some(holders) = token.estimated_holders {
        if holders < config.min_holders {
            return Err(FilterRejection::FewHolders(holders));
        }
    }
    if let Some(organic) = token.organic_score {
        if organic < config.min_organic_score {
            return Err(FilterRejection::LowOrganicScore(organic));
        }
    }
    if let Some(quality) = token.quality_score {
        if quality < config.min_quality_score {
            return Err(FilterRejection::LowQualityScore(quality));
        }
    }
    Ok(())
}

/// Apply the gate and order survivors by 24h volume, highest first
pub fn filter_candidates(
    candidates: Vec<TokenCandidate>,
    config: &HivemindStrategyConfig,
    blacklist: &Blacklist,
) -> Vec<TokenCandidate> {
    let total = candidates.len();
    let mut passed: Vec<TokenCandidate> = candidates
        .into_iter()
        .filter(|token| match check_candidate(token, config, blacklist) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!("Filtered {} ({}): {:?}", token.symbol, token.mint, reason);
                false
            }
        })
        .collect();

    passed.sort_by(|a, b| {
        let va = a.volume_24h_usd.unwrap_or(0.0);
        let vb = b.volume_24h_usd.unwrap_or(0.0);
        vb.partial_cmp(&va)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.mint.cmp(&b.mint))
    });

    tracing::debug!("Quality gate: {}/{} candidates passed", passed.len(), total);
    passed
}
