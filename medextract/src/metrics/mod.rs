//! Prometheus instruments for ingestion and comparison traffic.
//!
//! Exposed at `/internal/metrics` when `enable_metrics` is set.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::analytics::{ComparisonResult, Observation};

#[derive(Clone)]
pub struct ObservationMetrics {
    /// Ingested observations by version and outcome
    observations: IntCounterVec,
    /// Extraction latency as reported by the pipeline
    processing_time: HistogramVec,
    /// Input and output tokens per observation
    token_usage: HistogramVec,
    /// Comparisons served, by decision
    comparisons: IntCounterVec,
    registry: Registry,
}

impl ObservationMetrics {
    /// Create the instruments and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let observations = IntCounterVec::new(
            Opts::new("medextract_observations_total", "Extraction observations recorded"),
            &["prompt_version", "outcome"],
        )?;
        registry.register(Box::new(observations.clone()))?;

        let processing_time = HistogramVec::new(
            HistogramOpts::new("medextract_processing_time_seconds", "Extraction processing time")
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]),
            &["prompt_version"],
        )?;
        registry.register(Box::new(processing_time.clone()))?;

        // Exponential with factor 4, 1 to ~1M tokens
        let token_buckets = vec![1.0, 4.0, 16.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0];
        let token_usage = HistogramVec::new(
            HistogramOpts::new("medextract_token_usage", "Tokens used per extraction").buckets(token_buckets),
            &["prompt_version", "token_type"],
        )?;
        registry.register(Box::new(token_usage.clone()))?;

        let comparisons = IntCounterVec::new(
            Opts::new("medextract_comparisons_total", "Prompt version comparisons served"),
            &["decision"],
        )?;
        registry.register(Box::new(comparisons.clone()))?;

        Ok(Self {
            observations,
            processing_time,
            token_usage,
            comparisons,
            registry: registry.clone(),
        })
    }

    pub fn record_observation(&self, observation: &Observation) {
        let version = observation.prompt_version.as_str();
        let outcome = if observation.success { "success" } else { "failure" };
        self.observations.with_label_values(&[version, outcome]).inc();

        if let Some(ms) = observation.processing_time_ms {
            self.processing_time.with_label_values(&[version]).observe(ms as f64 / 1000.0);
        }
        self.token_usage
            .with_label_values(&[version, "input"])
            .observe(observation.input_tokens as f64);
        self.token_usage
            .with_label_values(&[version, "output"])
            .observe(observation.output_tokens as f64);
    }

    pub fn record_comparison(&self, result: &ComparisonResult) {
        let decision = result.decision.to_string();
        self.comparisons.with_label_values(&[decision.as_str()]).inc();
    }

    /// Render every registered family in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn observation(success: bool) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            prompt_version: "v2.0.0".to_string(),
            model_id: None,
            success,
            processing_time_ms: Some(1200),
            input_tokens: 1500,
            output_tokens: 300,
            fields_extracted: 7,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_render() {
        let metrics = ObservationMetrics::new(&Registry::new()).unwrap();
        metrics.record_observation(&observation(true));
        metrics.record_observation(&observation(true));
        metrics.record_observation(&observation(false));

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"medextract_observations_total{outcome="success",prompt_version="v2.0.0"} 2"#));
        assert!(text.contains(r#"medextract_observations_total{outcome="failure",prompt_version="v2.0.0"} 1"#));
        assert!(text.contains("medextract_processing_time_seconds_count{prompt_version=\"v2.0.0\"} 3"));
        assert!(text.contains("token_type=\"input\""));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        ObservationMetrics::new(&registry).unwrap();
        assert!(ObservationMetrics::new(&registry).is_err());
    }
}
