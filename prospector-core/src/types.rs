//! Core type definitions for Prospector.
//!
//! Defines the job lifecycle, the structured research report and its
//! sub-records, and the conversation types sent to the generation capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of follow-up questions allowed per completed research job.
pub const QUESTION_QUOTA: u32 = 10;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Participant role in a generation conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One (role, text) turn in a generation conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Job lifecycle
// ---------------------------------------------------------------------------

/// Kind of tracked work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Research,
    Search,
    Crawl,
    Extract,
}

/// Lifecycle status of a job.
///
/// Research jobs move `Queued → Searching → Analyzing → Compiling →
/// Completed | Failed`; one-shot jobs go straight to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Searching,
    Analyzing,
    Compiling,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Searching => "searching",
            JobStatus::Analyzing => "analyzing",
            JobStatus::Compiling => "compiling",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One appended follow-up exchange. Entries are never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

/// A tracked unit of work.
///
/// Invariants: `report` is non-null iff `status == Completed` and the kind is
/// research; `error` is non-null iff `status == Failed`. Jobs are created on
/// submission and mutated only by the pipeline (research) or the request
/// handler that owns them (other kinds); deletion is an explicit external
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub query: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ResearchReport>,
    /// Raw result payload for non-report job kinds (search/crawl/extract).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub qa_history: Vec<QaEntry>,
    #[serde(default = "default_quota")]
    pub qa_remaining: u32,
}

fn default_quota() -> u32 {
    QUESTION_QUOTA
}

impl Job {
    /// Create a new queued job for the given subject.
    pub fn new(kind: JobKind, query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            status: JobStatus::Queued,
            query: query.into(),
            created_at: Utc::now(),
            completed_at: None,
            duration_secs: None,
            report: None,
            operation_result: None,
            error: None,
            qa_history: Vec::new(),
            qa_remaining: QUESTION_QUOTA,
        }
    }

    /// Whether this job is a completed research job carrying a report.
    pub fn has_report(&self) -> bool {
        self.status == JobStatus::Completed && self.report.is_some()
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Relevance / confidence tier used across report records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    #[default]
    Medium,
    Low,
}

impl Tier {
    /// Parse a tier label case-insensitively. Unknown labels return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Tier::High),
            "medium" => Some(Tier::Medium),
            "low" => Some(Tier::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::High => write!(f, "high"),
            Tier::Medium => write!(f, "medium"),
            Tier::Low => write!(f, "low"),
        }
    }
}

/// SWOT analysis: four bullet lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwotAnalysis {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
}

impl SwotAnalysis {
    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
            && self.weaknesses.is_empty()
            && self.opportunities.is_empty()
            && self.threats.is_empty()
    }
}

/// A market trend with a relevance rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub relevance: Tier,
}

/// A deduplicated evidence source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

/// One mapped decision-maker from the leadership roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub confidence: Tier,
}

/// Scored assessment against the ideal-customer profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IcpFitAssessment {
    #[serde(default)]
    pub fit_score: u8,
    #[serde(default)]
    pub fit_tier: Tier,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub recommended_pitch_angles: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

/// One (year, amount) revenue data point. Amounts stay as reported strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueYear {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub amount: String,
}

/// Financial summary block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinancials {
    #[serde(default)]
    pub core_business_summary: String,
    #[serde(default = "default_market_cap")]
    pub market_cap: String,
    #[serde(default = "default_unknown")]
    pub funding_stage: String,
    #[serde(default)]
    pub revenue_history: Vec<RevenueYear>,
}

fn default_market_cap() -> String {
    "Private or Unknown".to_string()
}

fn default_unknown() -> String {
    "Unknown".to_string()
}

impl Default for CompanyFinancials {
    fn default() -> Self {
        Self {
            core_business_summary: String::new(),
            market_cap: default_market_cap(),
            funding_stage: default_unknown(),
            revenue_history: Vec::new(),
        }
    }
}

/// One funding round on the timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingMilestone {
    #[serde(default)]
    pub date_or_round: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub investors: Vec<String>,
}

/// Three-valued label for compute-buying intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ComputeIntent {
    Hot,
    Warm,
    #[default]
    Cold,
}

impl ComputeIntent {
    /// Parse a label case-insensitively. Unknown labels return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hot" => Some(ComputeIntent::Hot),
            "warm" => Some(ComputeIntent::Warm),
            "cold" => Some(ComputeIntent::Cold),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComputeIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeIntent::Hot => write!(f, "Hot"),
            ComputeIntent::Warm => write!(f, "Warm"),
            ComputeIntent::Cold => write!(f, "Cold"),
        }
    }
}

/// Funding and capital-allocation intelligence block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingIntelligence {
    #[serde(default)]
    pub investor_types: Vec<String>,
    #[serde(default)]
    pub funding_timeline: Vec<FundingMilestone>,
    #[serde(default = "default_unknown")]
    pub capital_allocation_purpose: String,
    #[serde(default)]
    pub compute_intent: ComputeIntent,
    #[serde(default = "default_spending_evidence")]
    pub compute_spending_evidence: String,
}

pub(crate) fn default_spending_evidence() -> String {
    "No explicit evidence of GPU/AI infrastructure scaling found.".to_string()
}

impl Default for FundingIntelligence {
    fn default() -> Self {
        Self {
            investor_types: Vec::new(),
            funding_timeline: Vec::new(),
            capital_allocation_purpose: default_unknown(),
            compute_intent: ComputeIntent::Cold,
            compute_spending_evidence: default_spending_evidence(),
        }
    }
}

/// The final structured research artifact. Immutable once assembled.
///
/// Every field is always present (possibly empty) so report consumers never
/// need null checks beyond the optionality of the report itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    #[serde(default)]
    pub company_overview: String,
    #[serde(default)]
    pub financials: CompanyFinancials,
    #[serde(default)]
    pub funding_intelligence: FundingIntelligence,
    #[serde(default)]
    pub swot: SwotAnalysis,
    #[serde(default)]
    pub trends: Vec<Trend>,
    #[serde(default)]
    pub competitive_landscape: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub leadership: Vec<LeaderProfile>,
    #[serde(default)]
    pub icp_fit: IcpFitAssessment,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new(JobKind::Research, "Acme Robotics");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.query, "Acme Robotics");
        assert_eq!(job.qa_remaining, QUESTION_QUOTA);
        assert!(job.report.is_none());
        assert!(job.error.is_none());
        assert!(!job.has_report());
    }

    #[test]
    fn test_job_ids_unique() {
        let a = Job::new(JobKind::Research, "x");
        let b = Job::new(JobKind::Research, "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Analyzing).unwrap(),
            "\"analyzing\""
        );
        let s: JobStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(s, JobStatus::Completed);
    }

    #[test]
    fn test_tier_parse() {
        assert_eq!(Tier::parse("High"), Some(Tier::High));
        assert_eq!(Tier::parse(" medium "), Some(Tier::Medium));
        assert_eq!(Tier::parse("LOW"), Some(Tier::Low));
        assert_eq!(Tier::parse("critical"), None);
        assert_eq!(Tier::default(), Tier::Medium);
    }

    #[test]
    fn test_compute_intent_parse() {
        assert_eq!(ComputeIntent::parse("HOT"), Some(ComputeIntent::Hot));
        assert_eq!(ComputeIntent::parse("warm"), Some(ComputeIntent::Warm));
        assert_eq!(ComputeIntent::parse("lukewarm"), None);
        assert_eq!(ComputeIntent::default(), ComputeIntent::Cold);
    }

    #[test]
    fn test_report_default_is_fully_populated() {
        let report = ResearchReport::default();
        assert_eq!(report.financials.market_cap, "Private or Unknown");
        assert_eq!(report.financials.funding_stage, "Unknown");
        assert_eq!(
            report.funding_intelligence.compute_intent,
            ComputeIntent::Cold
        );
        assert!(report.swot.is_empty());
        assert!(report.sources.is_empty());
    }

    #[test]
    fn test_report_serde_roundtrip() {
        let mut report = ResearchReport::default();
        report.company_overview = "An overview.".into();
        report.trends.push(Trend {
            title: "GPU demand".into(),
            description: "Growing.".into(),
            relevance: Tier::High,
        });
        let json = serde_json::to_string(&report).unwrap();
        let restored: ResearchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, report);
    }

    #[test]
    fn test_message_constructors() {
        let m = Message::system("be terse");
        assert_eq!(m.role, Role::System);
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }
}
