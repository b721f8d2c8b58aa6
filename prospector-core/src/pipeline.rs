//! Research pipeline: search, analyze, compile.
//!
//! One pipeline run owns one job. Stages execute strictly in sequence and
//! every status transition is written through the job store so pollers see
//! progress. Malformed model output never fails a run (the extractor absorbs
//! it); a generation call that is still failing after its retry budget fails
//! the whole job, which then carries an error string and no report.

use crate::config::RetryConfig;
use crate::error::{LlmError, ProspectorError};
use crate::evidence::{ContextLimits, EvidenceAggregator, format_context};
use crate::extract;
use crate::prompts;
use crate::provider::{GenerationProvider, with_retry};
use crate::store::JobStore;
use crate::types::{Job, JobStatus, Message, ResearchReport};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Orchestrates the staged research pipeline for one job at a time.
pub struct ResearchPipeline {
    provider: Arc<dyn GenerationProvider>,
    aggregator: EvidenceAggregator,
    store: Arc<dyn JobStore>,
    retry: RetryConfig,
    limits: ContextLimits,
}

impl ResearchPipeline {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        aggregator: EvidenceAggregator,
        store: Arc<dyn JobStore>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            aggregator,
            store,
            retry,
            limits: ContextLimits::default(),
        }
    }

    /// Run the full pipeline for a stored job, stamping the terminal state.
    pub async fn run(&self, job_id: &str) {
        let Some(mut job) = self.store.get(job_id).await else {
            warn!(job_id, "Pipeline started for unknown job");
            return;
        };
        let start = Instant::now();

        match self.execute(&mut job).await {
            Ok(report) => {
                job.report = Some(report);
                job.status = JobStatus::Completed;
                job.error = None;
                info!(job_id, subject = %job.query, "Research complete");
            }
            Err(e) => {
                job.report = None;
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                error!(job_id, error = %e, "Research failed");
            }
        }

        job.completed_at = Some(Utc::now());
        job.duration_secs = Some((start.elapsed().as_secs_f64() * 10.0).round() / 10.0);
        self.store.put(job).await;
    }

    async fn execute(&self, job: &mut Job) -> Result<ResearchReport, ProspectorError> {
        // --- Stage 1: search ---
        self.transition(job, JobStatus::Searching).await;
        let bundle = self.aggregator.collect(&job.query).await;
        let context = format_context(&bundle, &self.limits);
        info!(job_id = %job.id, chars = context.len(), "Evidence context built");

        // --- Stage 2: analyze ---
        self.transition(job, JobStatus::Analyzing).await;
        let subject = job.query.clone();

        let swot = extract::extract_swot(&self.round(
            "You are a senior market research analyst. Respond only in valid JSON.",
            &prompts::swot(&subject, &context),
        ).await?);
        info!(
            job_id = %job.id,
            s = swot.strengths.len(),
            w = swot.weaknesses.len(),
            o = swot.opportunities.len(),
            t = swot.threats.len(),
            "SWOT generated"
        );

        let trends = extract::extract_trends(&self.round(
            "You are a market intelligence analyst. Respond only in valid JSON.",
            &prompts::trends(&subject, &context),
        ).await?);
        info!(job_id = %job.id, trends = trends.len(), "Trends generated");

        let leadership = extract::extract_leaders(&self.round(
            "You are a B2B sales intelligence analyst. Respond only in valid JSON.",
            &prompts::leaders(&subject, &context),
        ).await?);
        info!(job_id = %job.id, leaders = leadership.len(), "Leadership mapped");

        let icp_fit = extract::extract_fit(&self.round(
            "You are an enterprise GTM analyst. Respond only in valid JSON.",
            &prompts::icp_fit(&subject, &context),
        ).await?);

        let financials = extract::extract_financials(&self.round(
            "You are a financial research analyst. Respond only in valid JSON.",
            &prompts::financials(&subject, &context),
        ).await?);

        let funding_intelligence = extract::extract_funding(&self.round(
            "You are a venture intelligence analyst. Respond only in valid JSON.",
            &prompts::funding(&subject, &context),
        ).await?);

        // --- Stage 3: compile ---
        self.transition(job, JobStatus::Compiling).await;
        let swot_json = serde_json::to_string_pretty(&swot)?;
        let trends_json = serde_json::to_string_pretty(&trends)?;
        let compiled = extract::extract_compiled(&self.round(
            "You are an expert business writer. Respond only in valid JSON.",
            &prompts::report(&subject, &context, &swot_json, &trends_json),
        ).await?);

        Ok(ResearchReport {
            company_overview: compiled.company_overview,
            financials,
            funding_intelligence,
            swot,
            trends,
            competitive_landscape: compiled.competitive_landscape,
            key_findings: compiled.key_findings,
            leadership,
            icp_fit,
            sources: bundle.sources,
        })
    }

    /// One retried generation round followed by defensive JSON recovery.
    async fn round(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<extract::RawExtraction, LlmError> {
        let messages = [Message::system(system), Message::user(prompt)];
        let text = with_retry(&self.retry, || self.provider.complete(&messages)).await?;
        Ok(extract::parse_llm_json(&text))
    }

    async fn transition(&self, job: &mut Job, status: JobStatus) {
        job.status = status;
        info!(job_id = %job.id, status = %status, "Stage transition");
        self.store.put(job.clone()).await;
    }
}
