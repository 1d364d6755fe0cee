//! Per-model token pricing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::{AnalyticsError, Result};

pub const CLAUDE_3_HAIKU: &str = "anthropic.claude-3-haiku-20240307-v1:0";
pub const CLAUDE_3_SONNET: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// USD rates per 1,000 tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1000.0 * self.input_per_1k + output_tokens as f64 / 1000.0 * self.output_per_1k
    }
}

/// Model identifier to rate mapping.
///
/// Ordered so that serialization and iteration are stable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PricingTable(BTreeMap<String, ModelPricing>);

impl PricingTable {
    pub fn new(rates: impl IntoIterator<Item = (String, ModelPricing)>) -> Self {
        Self(rates.into_iter().collect())
    }

    pub fn get(&self, model: &str) -> Result<&ModelPricing> {
        self.0.get(model).ok_or_else(|| AnalyticsError::UnknownModel { model: model.to_string() })
    }

    /// Cost in USD of a single request against `model`.
    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> Result<f64> {
        Ok(self.get(model)?.cost(input_tokens, output_tokens))
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Reject rates that would silently under-report cost.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(AnalyticsError::validation("pricing table is empty"));
        }
        for (model, rates) in &self.0 {
            let finite = rates.input_per_1k.is_finite() && rates.output_per_1k.is_finite();
            if !finite || rates.input_per_1k < 0.0 || rates.output_per_1k < 0.0 {
                return Err(AnalyticsError::validation(format!(
                    "pricing for '{model}' must be finite and non-negative"
                )));
            }
            if rates.input_per_1k == 0.0 && rates.output_per_1k == 0.0 {
                return Err(AnalyticsError::validation(format!("pricing for '{model}' is zero for both input and output")));
            }
        }
        Ok(())
    }
}

impl Default for PricingTable {
    /// Bedrock on-demand rates, us-east-1
    fn default() -> Self {
        Self::new([
            (
                CLAUDE_3_HAIKU.to_string(),
                ModelPricing {
                    input_per_1k: 0.00025,
                    output_per_1k: 0.00125,
                },
            ),
            (
                CLAUDE_3_SONNET.to_string(),
                ModelPricing {
                    input_per_1k: 0.003,
                    output_per_1k: 0.015,
                },
            ),
        ])
    }
}
