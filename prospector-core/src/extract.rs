//! Defensive extraction: recovers JSON from free-form model output and
//! normalizes heterogeneous shapes into the fixed report schemas.
//!
//! Parsing follows a fallback ladder and never errors; every normalizer is a
//! total function from a [`RawExtraction`] to a default-filled typed record.
//! Wrong key casing, wrapper nesting (up to two levels), singular/plural key
//! variants, and scalar-vs-list mismatches are all tolerated.

use crate::types::{
    CompanyFinancials, ComputeIntent, FundingIntelligence, FundingMilestone, IcpFitAssessment,
    LeaderProfile, RevenueYear, SwotAnalysis, Tier, Trend, default_spending_evidence,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

/// Maximum leadership roster length after deduplication.
pub const MAX_LEADERS: usize = 12;
/// Maximum funding timeline length after deduplication.
pub const MAX_FUNDING_MILESTONES: usize = 20;

/// Raw JSON recovered from model output.
#[derive(Debug, Clone, PartialEq)]
pub enum RawExtraction {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Empty,
}

impl RawExtraction {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(RawExtraction::Object(map)),
            Value::Array(items) => Some(RawExtraction::Array(items)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON recovery ladder
// ---------------------------------------------------------------------------

/// Parse a JSON value out of raw model text. Strategies, first success wins:
///
/// 1. the entire text;
/// 2. a ```json fenced block, else any fenced block;
/// 3. the outermost `{...}` span, else the outermost `[...]` span;
/// 4. give up and return [`RawExtraction::Empty`]. Never errors.
pub fn parse_llm_json(text: &str) -> RawExtraction {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(raw) = RawExtraction::from_value(value) {
            return raw;
        }
    }

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(inner.trim()) {
            if let Some(raw) = RawExtraction::from_value(value) {
                return raw;
            }
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(span) = bracket_span(trimmed, open, close) {
            if let Ok(value) = serde_json::from_str::<Value>(span) {
                if let Some(raw) = RawExtraction::from_value(value) {
                    return raw;
                }
            }
        }
    }

    warn!(
        head = %trimmed.chars().take(200).collect::<String>(),
        "Failed to recover JSON from model output"
    );
    RawExtraction::Empty
}

/// Contents of a ```json fenced block, else the first fenced block of any tag.
fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(&body[..end]);
        }
    }
    let start = text.find("```")?;
    let body = &text[start + 3..];
    // skip an optional language tag on the opening line
    let body = match body.find('\n') {
        Some(nl) if body[..nl].trim().chars().all(|c| c.is_alphanumeric()) => &body[nl + 1..],
        _ => body,
    };
    let end = body.find("```")?;
    Some(&body[..end])
}

/// Span from the first `open` to the last `close` in the text, if ordered.
fn bracket_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Shared shape-tolerance helpers
// ---------------------------------------------------------------------------

/// Case-insensitive lookup of any of `keys` in a JSON object.
fn get_ci<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    for (k, v) in map {
        let lower = k.to_lowercase();
        if keys.iter().any(|want| lower == *want) {
            return Some(v);
        }
    }
    None
}

/// Scalar-to-string coercion: strings pass through, numbers and booleans are
/// rendered, containers and null yield `None`.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce a value into a string list. A bare scalar becomes a one-element
/// list; array items that are not scalars are dropped.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => value_to_string(other)
            .filter(|s| !s.is_empty())
            .map(|s| vec![s])
            .unwrap_or_default(),
    }
}

fn get_string(map: &Map<String, Value>, keys: &[&str]) -> String {
    get_ci(map, keys)
        .and_then(value_to_string)
        .unwrap_or_default()
}

fn get_string_or(map: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    let s = get_string(map, keys);
    if s.is_empty() { default.to_string() } else { s }
}

fn get_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    get_ci(map, keys).map(string_list).unwrap_or_default()
}

/// Candidate objects to probe, in order: the top-level object, then every
/// object nested one level under a wrapper key, then two levels.
fn candidate_objects(raw: &RawExtraction) -> Vec<&Map<String, Value>> {
    let RawExtraction::Object(top) = raw else {
        return Vec::new();
    };
    let mut candidates = vec![top];
    for value in top.values() {
        if let Value::Object(level1) = value {
            candidates.push(level1);
            for value2 in level1.values() {
                if let Value::Object(level2) = value2 {
                    candidates.push(level2);
                }
            }
        }
    }
    candidates
}

/// First array found under any of `keys` across the candidate objects, or the
/// raw value itself when the model returned a bare array.
fn find_array<'a>(raw: &'a RawExtraction, keys: &[&str]) -> Option<&'a [Value]> {
    if let RawExtraction::Array(items) = raw {
        return Some(items);
    }
    for map in candidate_objects(raw) {
        if let Some(Value::Array(items)) = get_ci(map, keys) {
            return Some(items);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Per-schema normalizers
// ---------------------------------------------------------------------------

const SWOT_KEYS: [&str; 4] = ["strengths", "weaknesses", "opportunities", "threats"];

/// Extract a SWOT record. Accepts the four lists at the top level or nested
/// under wrapper keys; a candidate object is accepted once at least two of
/// the four keys are present.
pub fn extract_swot(raw: &RawExtraction) -> SwotAnalysis {
    for map in candidate_objects(raw) {
        let found = SWOT_KEYS
            .iter()
            .filter(|&&k| get_ci(map, &[k]).is_some())
            .count();
        if found >= 2 {
            return SwotAnalysis {
                strengths: get_list(map, &["strengths"]),
                weaknesses: get_list(map, &["weaknesses"]),
                opportunities: get_list(map, &["opportunities"]),
                threats: get_list(map, &["threats"]),
            };
        }
    }
    warn!("Could not locate SWOT keys in model output");
    SwotAnalysis::default()
}

/// Extract the trend list. Entries without a title are dropped; relevance
/// defaults to medium when absent or invalid.
pub fn extract_trends(raw: &RawExtraction) -> Vec<Trend> {
    let Some(items) = find_array(raw, &["trends", "market_trends"]) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let map = item.as_object()?;
            let title = get_string(map, &["title", "trend", "name"]);
            if title.is_empty() {
                return None;
            }
            Some(Trend {
                title,
                description: get_string(map, &["description", "summary"]),
                relevance: get_ci(map, &["relevance"])
                    .and_then(value_to_string)
                    .and_then(|s| Tier::parse(&s))
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Extract the leadership roster: key variants tolerated, entries
/// deduplicated on case-insensitive (name, title), capped at [`MAX_LEADERS`].
pub fn extract_leaders(raw: &RawExtraction) -> Vec<LeaderProfile> {
    let keys = [
        "leaders",
        "leadership",
        "leadership_team",
        "executives",
        "team",
        "people",
        "management",
    ];
    let Some(items) = find_array(raw, &keys) else {
        return Vec::new();
    };

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut roster = Vec::new();

    for item in items {
        let Some(map) = item.as_object() else {
            continue;
        };
        let name = get_string(map, &["name", "full_name"]);
        let title = get_string(map, &["title", "role", "position"]);
        if name.is_empty() && title.is_empty() {
            continue;
        }
        if !seen.insert((name.to_lowercase(), title.to_lowercase())) {
            continue;
        }
        roster.push(LeaderProfile {
            name,
            title,
            function: get_string(map, &["function", "department"]),
            source_url: get_string(map, &["source_url", "source", "url"]),
            evidence: get_string(map, &["evidence", "snippet"]),
            confidence: get_ci(map, &["confidence"])
                .and_then(value_to_string)
                .and_then(|s| Tier::parse(&s))
                .unwrap_or_default(),
        });
        if roster.len() == MAX_LEADERS {
            break;
        }
    }
    roster
}

/// Derive a fit tier from the fixed score thresholds.
fn derive_tier(score: u8) -> Tier {
    if score >= 80 {
        Tier::High
    } else if score >= 50 {
        Tier::Medium
    } else {
        Tier::Low
    }
}

/// Parse an integer-like score from a number or numeric string, clamped to
/// [0, 100].
fn parse_score(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(n.clamp(0.0, 100.0).round() as u8)
}

/// Extract the ICP fit assessment. The score is clamped to [0, 100]; the tier
/// is derived from thresholds (>=80 high, >=50 medium, else low) unless an
/// explicit valid tier is present, which always wins.
pub fn extract_fit(raw: &RawExtraction) -> IcpFitAssessment {
    for map in candidate_objects(raw) {
        let score_value = get_ci(map, &["fit_score", "score"]);
        let has_shape = score_value.is_some()
            || get_ci(map, &["fit_tier", "summary", "reasons"]).is_some();
        if !has_shape {
            continue;
        }

        let fit_score = score_value.and_then(parse_score).unwrap_or(0);
        let explicit_tier = get_ci(map, &["fit_tier", "tier"])
            .and_then(value_to_string)
            .and_then(|s| Tier::parse(&s));

        return IcpFitAssessment {
            fit_score,
            fit_tier: explicit_tier.unwrap_or_else(|| derive_tier(fit_score)),
            summary: get_string(map, &["summary"]),
            reasons: get_list(map, &["reasons"]),
            recommended_pitch_angles: get_list(
                map,
                &["recommended_pitch_angles", "pitch_angles"],
            ),
            concerns: get_list(map, &["concerns"]),
        };
    }
    IcpFitAssessment {
        fit_tier: Tier::Low,
        ..IcpFitAssessment::default()
    }
}

/// Extract the financial summary block.
pub fn extract_financials(raw: &RawExtraction) -> CompanyFinancials {
    for map in candidate_objects(raw) {
        let shape_keys = [
            "core_business_summary",
            "business_summary",
            "market_cap",
            "funding_stage",
            "revenue_history",
        ];
        if get_ci(map, &shape_keys).is_none() {
            continue;
        }

        let revenue_history = get_ci(map, &["revenue_history", "revenues", "revenue"])
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let m = item.as_object()?;
                        let year = get_string(m, &["year", "fiscal_year"]);
                        let amount = get_string(m, &["amount", "revenue", "value"]);
                        if year.is_empty() && amount.is_empty() {
                            None
                        } else {
                            Some(RevenueYear { year, amount })
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        return CompanyFinancials {
            core_business_summary: get_string(
                map,
                &["core_business_summary", "business_summary", "summary"],
            ),
            market_cap: get_string_or(
                map,
                &["market_cap", "market_capitalization"],
                "Private or Unknown",
            ),
            funding_stage: get_string_or(map, &["funding_stage", "stage"], "Unknown"),
            revenue_history,
        };
    }
    CompanyFinancials::default()
}

/// Extract the funding intelligence block. Timeline entries are deduplicated
/// on case-insensitive (round, amount) and capped.
pub fn extract_funding(raw: &RawExtraction) -> FundingIntelligence {
    for map in candidate_objects(raw) {
        let shape_keys = [
            "investor_types",
            "funding_timeline",
            "capital_allocation_purpose",
            "compute_intent",
            "e2e_compute_lead_status",
        ];
        if get_ci(map, &shape_keys).is_none() {
            continue;
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut timeline = Vec::new();
        if let Some(items) = get_ci(map, &["funding_timeline", "timeline", "funding_rounds"])
            .and_then(Value::as_array)
        {
            for item in items {
                let Some(m) = item.as_object() else {
                    continue;
                };
                let date_or_round = get_string(m, &["date_or_round", "round", "date"]);
                let amount = get_string(m, &["amount", "raised"]);
                if date_or_round.is_empty() && amount.is_empty() {
                    continue;
                }
                if !seen.insert((date_or_round.to_lowercase(), amount.to_lowercase())) {
                    continue;
                }
                timeline.push(FundingMilestone {
                    date_or_round,
                    amount,
                    investors: get_ci(m, &["investors", "participants"])
                        .map(string_list)
                        .unwrap_or_default(),
                });
                if timeline.len() == MAX_FUNDING_MILESTONES {
                    break;
                }
            }
        }

        return FundingIntelligence {
            investor_types: get_list(map, &["investor_types", "investors"]),
            funding_timeline: timeline,
            capital_allocation_purpose: get_string_or(
                map,
                &["capital_allocation_purpose", "capital_allocation"],
                "Unknown",
            ),
            compute_intent: get_ci(
                map,
                &["compute_intent", "e2e_compute_lead_status", "lead_status"],
            )
            .and_then(value_to_string)
            .and_then(|s| ComputeIntent::parse(&s))
            .unwrap_or_default(),
            compute_spending_evidence: get_string_or(
                map,
                &["compute_spending_evidence", "spending_evidence"],
                &default_spending_evidence(),
            ),
        };
    }
    FundingIntelligence::default()
}

/// The compile-round sections: overview, landscape, findings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSections {
    pub company_overview: String,
    pub competitive_landscape: String,
    pub key_findings: Vec<String>,
}

/// Extract the compile-round sections.
pub fn extract_compiled(raw: &RawExtraction) -> CompiledSections {
    for map in candidate_objects(raw) {
        let shape_keys = ["company_overview", "overview", "competitive_landscape"];
        if get_ci(map, &shape_keys).is_none() {
            continue;
        }
        return CompiledSections {
            company_overview: get_string(map, &["company_overview", "overview"]),
            competitive_landscape: get_string(map, &["competitive_landscape", "landscape"]),
            key_findings: get_list(map, &["key_findings", "findings"]),
        };
    }
    CompiledSections::default()
}
