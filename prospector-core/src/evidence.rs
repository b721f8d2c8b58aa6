//! Evidence aggregator: fans out the fixed topical queries for a subject,
//! deduplicates sources, and assembles the bounded text context fed to the
//! generation capability.

use crate::search::{SearchClient, SearchQuery, SearchResult, TimeRange};
use crate::types::Source;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// The fixed topical categories, in the order they appear in the context.
pub const CATEGORY_ORDER: [QueryCategory; 5] = [
    QueryCategory::Overview,
    QueryCategory::News,
    QueryCategory::Financial,
    QueryCategory::Competitors,
    QueryCategory::Leadership,
];

/// One of the fixed research angles queried for every subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryCategory {
    Overview,
    News,
    Financial,
    Competitors,
    Leadership,
}

impl QueryCategory {
    /// Section header label used in the formatted context.
    pub fn label(&self) -> &'static str {
        match self {
            QueryCategory::Overview => "OVERVIEW",
            QueryCategory::News => "NEWS",
            QueryCategory::Financial => "FINANCIAL",
            QueryCategory::Competitors => "COMPETITORS",
            QueryCategory::Leadership => "LEADERSHIP",
        }
    }

    /// Lowercase tag recorded on sources.
    pub fn key(&self) -> &'static str {
        match self {
            QueryCategory::Overview => "overview",
            QueryCategory::News => "news",
            QueryCategory::Financial => "financial",
            QueryCategory::Competitors => "competitors",
            QueryCategory::Leadership => "leadership",
        }
    }

    /// The fixed query issued for this category.
    pub fn query_for(&self, subject: &str, max_results: usize) -> SearchQuery {
        match self {
            QueryCategory::Overview => SearchQuery::general(
                format!("{subject} overview products services market position"),
                max_results,
            ),
            QueryCategory::News => SearchQuery::news(
                format!("{subject} latest news acquisitions partnerships"),
                TimeRange::Month,
                max_results,
            ),
            QueryCategory::Financial => SearchQuery::general(
                format!("{subject} revenue growth funding valuation"),
                max_results,
            ),
            QueryCategory::Competitors => SearchQuery::general(
                format!("{subject} competitors industry comparison market share"),
                max_results,
            ),
            QueryCategory::Leadership => SearchQuery::general(
                format!("{subject} leadership team executives board CTO CIO VP engineering"),
                max_results,
            ),
        }
    }
}

/// Collected per-category results plus the deduplicated source list.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBundle {
    pub categories: Vec<(QueryCategory, Vec<SearchResult>)>,
    pub sources: Vec<Source>,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(|(_, r)| r.is_empty())
    }
}

/// Size limits for the formatted context. The declared order and these caps
/// are a contract with the prompt layer.
#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    /// Global cap on the produced context.
    pub max_total_chars: usize,
    /// Cap per result snippet.
    pub max_snippet_chars: usize,
    /// Results included per category.
    pub max_results_per_category: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_total_chars: 12_000,
            max_snippet_chars: 500,
            max_results_per_category: 5,
        }
    }
}

/// Fans out the fixed topical queries for a subject.
pub struct EvidenceAggregator {
    search: Arc<SearchClient>,
    per_query_results: usize,
}

impl EvidenceAggregator {
    pub fn new(search: Arc<SearchClient>, per_query_results: usize) -> Self {
        Self {
            search,
            per_query_results,
        }
    }

    /// Run every category query in sequence. A failed query degrades to an
    /// empty category; an entirely empty bundle is a valid, non-fatal result.
    pub async fn collect(&self, subject: &str) -> EvidenceBundle {
        let mut categories = Vec::with_capacity(CATEGORY_ORDER.len());
        let mut sources = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for category in CATEGORY_ORDER {
            let query = category.query_for(subject, self.per_query_results);
            let results = match self.search.query_cached(&query).await {
                Ok(results) => results,
                Err(e) => {
                    warn!(category = category.key(), error = %e, "Category search failed");
                    Vec::new()
                }
            };

            for r in &results {
                if !r.url.is_empty() && seen_urls.insert(r.url.clone()) {
                    sources.push(Source {
                        url: r.url.clone(),
                        title: r.title.clone(),
                        category: category.key().to_string(),
                        retrieved_at: Some(Utc::now()),
                    });
                }
            }
            categories.push((category, results));
        }

        info!(
            subject = subject,
            sources = sources.len(),
            "Evidence collection complete"
        );
        EvidenceBundle {
            categories,
            sources,
        }
    }
}

/// Format an evidence bundle into a single bounded text context.
///
/// Categories are emitted in [`CATEGORY_ORDER`], at most
/// `max_results_per_category` results each, snippets truncated to
/// `max_snippet_chars`. The first result block that would cross the global
/// cap stops all further output, so a result is never cut mid-body and the
/// produced context never exceeds `max_total_chars`.
pub fn format_context(bundle: &EvidenceBundle, limits: &ContextLimits) -> String {
    let mut out = String::new();

    'categories: for (category, results) in &bundle.categories {
        let header = format!("\n## {}\n", category.label());
        if out.len() + header.len() > limits.max_total_chars {
            break;
        }
        out.push_str(&header);

        for result in results.iter().take(limits.max_results_per_category) {
            let title = if result.title.is_empty() {
                "Untitled"
            } else {
                &result.title
            };
            let snippet: String = result
                .snippet
                .chars()
                .take(limits.max_snippet_chars)
                .collect();
            let block = format!("### {title}\nSource: {}\n{snippet}\n\n", result.url);

            if out.len() + block.len() > limits.max_total_chars {
                break 'categories;
            }
            out.push_str(&block);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            score: 0.0,
        }
    }

    fn bundle_with(counts: &[usize], snippet_len: usize) -> EvidenceBundle {
        let snippet = "x".repeat(snippet_len);
        let categories = CATEGORY_ORDER
            .iter()
            .zip(counts)
            .map(|(cat, &n)| {
                let results = (0..n)
                    .map(|i| {
                        result(
                            &format!("{} {}", cat.key(), i),
                            &format!("https://site.test/{}/{}", cat.key(), i),
                            &snippet,
                        )
                    })
                    .collect();
                (*cat, results)
            })
            .collect();
        EvidenceBundle {
            categories,
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_category_order_is_fixed() {
        let bundle = bundle_with(&[1, 1, 1, 1, 1], 20);
        let context = format_context(&bundle, &ContextLimits::default());
        let overview = context.find("## OVERVIEW").unwrap();
        let news = context.find("## NEWS").unwrap();
        let financial = context.find("## FINANCIAL").unwrap();
        let competitors = context.find("## COMPETITORS").unwrap();
        let leadership = context.find("## LEADERSHIP").unwrap();
        assert!(overview < news && news < financial);
        assert!(financial < competitors && competitors < leadership);
    }

    #[test]
    fn test_results_capped_per_category() {
        let bundle = bundle_with(&[9, 0, 0, 0, 0], 20);
        let context = format_context(&bundle, &ContextLimits::default());
        let count = context.matches("### overview").count();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_snippet_truncated_to_cap() {
        let bundle = bundle_with(&[1, 0, 0, 0, 0], 2000);
        let limits = ContextLimits {
            max_snippet_chars: 500,
            ..ContextLimits::default()
        };
        let context = format_context(&bundle, &limits);
        let run = context.chars().filter(|&c| c == 'x').count();
        assert_eq!(run, 500);
    }

    #[test]
    fn test_global_cap_never_exceeded() {
        let bundle = bundle_with(&[5, 5, 5, 5, 5], 500);
        let limits = ContextLimits {
            max_total_chars: 1000,
            ..ContextLimits::default()
        };
        let context = format_context(&bundle, &limits);
        assert!(context.len() <= 1000);
    }

    #[test]
    fn test_cap_stops_before_a_partial_result() {
        // Each block is ~"### overview 0\nSource: ...\n" + 100 chars snippet.
        let bundle = bundle_with(&[3, 3, 0, 0, 0], 100);
        let limits = ContextLimits {
            max_total_chars: 320,
            max_snippet_chars: 500,
            max_results_per_category: 5,
        };
        let context = format_context(&bundle, &limits);
        assert!(context.len() <= 320);
        // Whole blocks only: every emitted result carries its full snippet.
        for part in context.split("### ").skip(1) {
            let xs = part.chars().filter(|&c| c == 'x').count();
            assert_eq!(xs, 100);
        }
        // The cap was hit in the first category, so the second never starts.
        assert!(!context.contains("## NEWS"));
    }

    #[test]
    fn test_empty_bundle_formats_headers_only() {
        let bundle = bundle_with(&[0, 0, 0, 0, 0], 0);
        let context = format_context(&bundle, &ContextLimits::default());
        assert!(context.contains("## OVERVIEW"));
        assert!(!context.contains("###"));
    }

    #[test]
    fn test_untitled_results_get_placeholder() {
        let mut bundle = bundle_with(&[1, 0, 0, 0, 0], 30);
        bundle.categories[0].1[0].title = String::new();
        let context = format_context(&bundle, &ContextLimits::default());
        assert!(context.contains("### Untitled"));
    }

    #[test]
    fn test_category_queries_embed_subject() {
        for category in CATEGORY_ORDER {
            let q = category.query_for("Acme Robotics", 10);
            assert!(q.text.contains("Acme Robotics"));
        }
        let news = QueryCategory::News.query_for("Acme", 10);
        assert_eq!(news.time_range, Some(TimeRange::Month));
    }
}
