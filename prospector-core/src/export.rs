//! Markdown rendering of a completed research report.

use crate::error::{JobError, ProspectorError};
use crate::types::{Job, ResearchReport};

/// Render a completed job's report as a standalone Markdown document.
pub fn report_markdown(job: &Job) -> Result<String, ProspectorError> {
    let report = job
        .report
        .as_ref()
        .ok_or_else(|| JobError::ReportNotReady { id: job.id.clone() })?;

    let mut md = String::new();
    md.push_str(&format!("# Market Research Report: {}\n\n", job.query));
    if let Some(completed) = job.completed_at {
        md.push_str(&format!(
            "*Generated: {}*\n\n",
            completed.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    render_overview(&mut md, report);
    render_financials(&mut md, report);
    render_funding(&mut md, report);
    render_swot(&mut md, report);
    render_trends(&mut md, report);
    render_leadership(&mut md, report);
    render_fit(&mut md, report);
    render_findings(&mut md, report);
    render_sources(&mut md, report);

    if !job.qa_history.is_empty() {
        md.push_str("## Follow-up Q&A\n\n");
        for entry in &job.qa_history {
            md.push_str(&format!("**Q: {}**\n\n{}\n\n", entry.question, entry.answer));
        }
    }

    Ok(md)
}

fn render_overview(md: &mut String, report: &ResearchReport) {
    if !report.company_overview.is_empty() {
        md.push_str("## Company Overview\n\n");
        md.push_str(&report.company_overview);
        md.push_str("\n\n");
    }
    if !report.competitive_landscape.is_empty() {
        md.push_str("## Competitive Landscape\n\n");
        md.push_str(&report.competitive_landscape);
        md.push_str("\n\n");
    }
}

fn render_financials(md: &mut String, report: &ResearchReport) {
    let f = &report.financials;
    md.push_str("## Financials\n\n");
    if !f.core_business_summary.is_empty() {
        md.push_str(&format!("{}\n\n", f.core_business_summary));
    }
    md.push_str(&format!("- **Market cap:** {}\n", f.market_cap));
    md.push_str(&format!("- **Funding stage:** {}\n\n", f.funding_stage));
    if !f.revenue_history.is_empty() {
        md.push_str("| Year | Revenue |\n|------|--------|\n");
        for r in &f.revenue_history {
            md.push_str(&format!("| {} | {} |\n", r.year, r.amount));
        }
        md.push('\n');
    }
}

fn render_funding(md: &mut String, report: &ResearchReport) {
    let f = &report.funding_intelligence;
    md.push_str("## Funding Intelligence\n\n");
    md.push_str(&format!("- **Compute intent:** {}\n", f.compute_intent));
    if !f.investor_types.is_empty() {
        md.push_str(&format!(
            "- **Investor types:** {}\n",
            f.investor_types.join(", ")
        ));
    }
    md.push_str(&format!(
        "- **Capital allocation:** {}\n\n",
        f.capital_allocation_purpose
    ));
    if !f.funding_timeline.is_empty() {
        md.push_str("| Round | Amount | Investors |\n|-------|--------|-----------|\n");
        for m in &f.funding_timeline {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                m.date_or_round,
                m.amount,
                m.investors.join(", ")
            ));
        }
        md.push('\n');
    }
    md.push_str(&format!("> {}\n\n", f.compute_spending_evidence));
}

fn render_swot(md: &mut String, report: &ResearchReport) {
    if report.swot.is_empty() {
        return;
    }
    md.push_str("## SWOT Analysis\n\n");
    let sections = [
        ("Strengths", &report.swot.strengths),
        ("Weaknesses", &report.swot.weaknesses),
        ("Opportunities", &report.swot.opportunities),
        ("Threats", &report.swot.threats),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        md.push_str(&format!("### {title}\n\n"));
        for item in items {
            md.push_str(&format!("- {item}\n"));
        }
        md.push('\n');
    }
}

fn render_trends(md: &mut String, report: &ResearchReport) {
    if report.trends.is_empty() {
        return;
    }
    md.push_str("## Market Trends\n\n");
    for trend in &report.trends {
        md.push_str(&format!(
            "### {} (relevance: {})\n\n{}\n\n",
            trend.title, trend.relevance, trend.description
        ));
    }
}

fn render_leadership(md: &mut String, report: &ResearchReport) {
    if report.leadership.is_empty() {
        return;
    }
    md.push_str("## Leadership\n\n");
    md.push_str("| Name | Title | Function | Confidence |\n|------|-------|----------|------------|\n");
    for leader in &report.leadership {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            leader.name, leader.title, leader.function, leader.confidence
        ));
    }
    md.push('\n');
}

fn render_fit(md: &mut String, report: &ResearchReport) {
    let fit = &report.icp_fit;
    md.push_str(&format!(
        "## ICP Fit: {}/100 ({})\n\n",
        fit.fit_score, fit.fit_tier
    ));
    if !fit.summary.is_empty() {
        md.push_str(&format!("{}\n\n", fit.summary));
    }
    for (title, items) in [
        ("Reasons", &fit.reasons),
        ("Recommended pitch angles", &fit.recommended_pitch_angles),
        ("Concerns", &fit.concerns),
    ] {
        if items.is_empty() {
            continue;
        }
        md.push_str(&format!("**{title}:**\n\n"));
        for item in items {
            md.push_str(&format!("- {item}\n"));
        }
        md.push('\n');
    }
}

fn render_findings(md: &mut String, report: &ResearchReport) {
    if report.key_findings.is_empty() {
        return;
    }
    md.push_str("## Key Findings\n\n");
    for finding in &report.key_findings {
        md.push_str(&format!("- {finding}\n"));
    }
    md.push('\n');
}

fn render_sources(md: &mut String, report: &ResearchReport) {
    if report.sources.is_empty() {
        return;
    }
    md.push_str("## Sources\n\n");
    for (i, source) in report.sources.iter().enumerate() {
        let title = if source.title.is_empty() {
            &source.url
        } else {
            &source.title
        };
        md.push_str(&format!("{}. [{}]({})\n", i + 1, title, source.url));
    }
    md.push('\n');
}
