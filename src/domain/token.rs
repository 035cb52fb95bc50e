//! Token Candidates
//!
//! Per-scan snapshot of a token's market metrics. Every metric apart from the
//! mint is optional because upstream market data is frequently partial.

use serde::{Deserialize, Serialize};

/// Precomputed technical indicators for a token
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Technicals {
    /// RSI-style oscillator (0-100)
    pub rsi: Option<f64>,
    /// Lower volatility band (support), in SOL
    pub lower_band: Option<f64>,
    /// Band midline, in SOL
    pub middle_band: Option<f64>,
    /// Upper volatility band (resistance), in SOL
    pub upper_band: Option<f64>,
}

impl Technicals {
    /// Both bands are present
    pub fn has_bands(&self) -> bool {
        self.lower_band.is_some() && self.upper_band.is_some()
    }
}

/// A token discovered during a scan cycle
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenCandidate {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub price_usd: Option<f64>,
    pub price_sol: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    /// Percent change over the last hour (5.0 = +5%)
    pub price_change_1h: Option<f64>,
    /// Percent change over the last 24 hours
    pub price_change_24h: Option<f64>,
    /// Organic activity score (0-100)
    pub organic_score: Option<f64>,
    /// Aggregator quality score (0-100)
    pub quality_score: Option<f64>,
    pub estimated_age_hours: Option<f64>,
    pub estimated_holders: Option<u64>,
    pub txns_24h: Option<u64>,
    pub buys_24h: Option<u64>,
    pub sells_24h: Option<u64>,
    pub txns_1h: Option<u64>,
    /// Recent SOL prices, oldest first
    pub price_history_sol: Vec<f64>,
    /// Indicators supplied by the data source, if any
    pub technicals: Option<Technicals>,
}

impl TokenCandidate {
    pub fn new(mint: impl Into<String>, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            mint: mint.into(),
            name: symbol.clone(),
            symbol,
            ..Self::default()
        }
    }

    /// Volume to liquidity ratio, if both are known and liquidity is non-zero
    pub fn volume_liquidity_ratio(&self) -> Option<f64> {
        match (self.volume_24h_usd, self.liquidity_usd) {
            (Some(volume), Some(liquidity)) if liquidity > 0.0 => Some(volume / liquidity),
            _ => None,
        }
    }

    /// Share of buys among buys + sells over 24h
    pub fn buy_ratio(&self) -> Option<(f64, u64)> {
        let buys = self.buys_24h?;
        let sells = self.sells_24h?;
        let total = buys + sells;
        if total == 0 {
            return None;
        }
        Some((buys as f64 / total as f64, total))
    }

    /// Current SOL price, falling back to the latest history sample
    pub fn current_price_sol(&self) -> Option<f64> {
        self.price_sol
            .or_else(|| self.price_history_sol.last().copied())
            .filter(|p| *p > 0.0)
    }

    pub fn change_1h(&self) -> f64 {
        self.price_change_1h.unwrap_or(0.0)
    }

    pub fn change_24h(&self) -> f64 {
        self.price_change_24h.unwrap_or(0.0)
    }
}

/// Validate a base58 encoded 32-byte identifier (wallet or mint address)
pub fn is_valid_address(address: &str) -> bool {
    match bs58::decode(address).into_vec() {
        Ok(bytes) => bytes.len() == 32,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_liquidity_ratio() {
        let mut token = TokenCandidate::new("mint", "TKN");
        assert!(token.volume_liquidity_ratio().is_none());

        token.volume_24h_usd = Some(2_000_000.0);
        token.liquidity_usd = Some(50_000.0);
        assert_eq!(token.volume_liquidity_ratio(), Some(40.0));

        token.liquidity_usd = Some(0.0);
        assert!(token.volume_liquidity_ratio().is_none());
    }

    #[test]
    fn test_buy_ratio() {
        let mut token = TokenCandidate::new("mint", "TKN");
        token.buys_24h = Some(90);
        token.sells_24h = Some(10);
        let (ratio, total) = token.buy_ratio().unwrap();
        assert_eq!(total, 100);
        assert!((ratio - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_current_price_falls_back_to_history() {
        let mut token = TokenCandidate::new("mint", "TKN");
        assert!(token.current_price_sol().is_none());
        token.price_history_sol = vec![0.1, 0.2];
        assert_eq!(token.current_price_sol(), Some(0.2));
        token.price_sol = Some(0.3);
        assert_eq!(token.current_price_sol(), Some(0.3));
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("So11111111111111111111111111111111111111112"));
        assert!(is_valid_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        assert!(!is_valid_address("not-an-address"));
        assert!(!is_valid_address("abc"));
    }
}
