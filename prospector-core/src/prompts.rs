//! Prompt templates for the analysis rounds and the follow-up engine.
//!
//! Templates carry `{placeholder}` markers filled by plain substitution, not
//! `format!`, because the bodies contain literal JSON braces.

const SWOT_PROMPT: &str = r#"You are a senior market research analyst. Based on the following information about {company_name}, generate a detailed SWOT analysis.

INSTRUCTIONS:
- Each category (Strengths, Weaknesses, Opportunities, Threats) should have 3-5 bullet points
- Each bullet point should be specific and data-backed where possible
- Focus on actionable insights, not generic observations
- If information is insufficient for a category, note what additional research is needed

CONTEXT DATA:
{context}

OUTPUT FORMAT (respond in valid JSON only, no extra text):
{
  "strengths": ["point 1", "point 2"],
  "weaknesses": ["point 1", "point 2"],
  "opportunities": ["point 1", "point 2"],
  "threats": ["point 1", "point 2"]
}"#;

const TRENDS_PROMPT: &str = r#"You are a market intelligence analyst. Based on the following web data about {company_name} and its industry, identify the top 5-7 current market trends.

INSTRUCTIONS:
- Each trend should have a clear title and 2-3 sentence description
- Rate each trend's relevance as high, medium, or low
- Focus on trends that are actionable for business strategy
- Include data points or evidence where available
- Don't fabricate statistics — only cite what's in the context

CONTEXT DATA:
{context}

OUTPUT FORMAT (respond in valid JSON only, no extra text):
[
  {
    "title": "Trend title",
    "description": "2-3 sentence description with evidence",
    "relevance": "high"
  }
]"#;

const LEADERS_PROMPT: &str = r#"You are a B2B sales intelligence analyst. Extract current leadership contacts for {company_name} from the context.

INSTRUCTIONS:
- Return 5-10 likely decision-makers relevant for infra/cloud/GPU conversations
- Specifically look for Founders and Co-Founders, as well as executive and senior technical roles (CEO, CTO, CIO, VP Engineering, Head of Infra, Head of AI/Data)
- Use only evidence present in context
- Do not invent people or titles
- If evidence is weak, lower confidence

CONTEXT DATA:
{context}

OUTPUT FORMAT (respond in valid JSON only, no extra text):
[
  {
    "name": "Full Name",
    "title": "Role Title (e.g. Founder, CEO)",
    "function": "Technology | Engineering | Data/AI | Finance | Operations | Other",
    "source_url": "https://...",
    "evidence": "Short snippet supporting this leadership mapping",
    "confidence": "high"
  }
]"#;

const ICP_FIT_PROMPT: &str = r#"You are an enterprise GTM analyst for E2E Networks.

E2E NETWORKS OFFERING (summary):
- GPU cloud infrastructure for AI training and inference
- High-performance compute and managed clusters
- Cost/performance positioning for AI workloads and model serving

Task: Evaluate how well {company_name} fits E2E Networks' ideal customer profile (ICP).

SCORING RUBRIC:
- 80-100: High fit (clear AI/GPU demand, scale, urgency, budget indicators)
- 50-79: Medium fit (some demand signals, partial readiness)
- 0-49: Low fit (weak relevance or missing signals)

INSTRUCTIONS:
- Use only context evidence
- Keep reasoning concise and practical for sales
- Include both positives and concerns

CONTEXT DATA:
{context}

OUTPUT FORMAT (respond in valid JSON only, no extra text):
{
  "fit_score": 72,
  "fit_tier": "medium",
  "summary": "1-2 sentence fit summary",
  "reasons": ["reason 1", "reason 2", "reason 3"],
  "recommended_pitch_angles": ["angle 1", "angle 2", "angle 3"],
  "concerns": ["concern 1", "concern 2"]
}"#;

const FINANCIALS_PROMPT: &str = r#"You are a financial research analyst. Summarize the financial profile of {company_name} from the context.

INSTRUCTIONS:
- Describe the core business in 1-2 sentences
- Report market cap only if stated in the context; otherwise use "Private or Unknown"
- Report the funding stage if stated; otherwise use "Unknown"
- List revenue figures per fiscal year only where the context gives them
- Do not estimate or invent any figure

CONTEXT DATA:
{context}

OUTPUT FORMAT (respond in valid JSON only, no extra text):
{
  "core_business_summary": "1-2 sentence summary",
  "market_cap": "$X or Private or Unknown",
  "funding_stage": "Series B / Public / Unknown",
  "revenue_history": [
    { "year": "2024", "amount": "$XM" }
  ]
}"#;

const FUNDING_PROMPT: &str = r#"You are a venture intelligence analyst. Extract funding and infrastructure-spend signals for {company_name} from the context.

INSTRUCTIONS:
- Classify the investor base (e.g. Tier 1 VC, strategic, sovereign, angel)
- List funding rounds with date or round name, amount, and investors, only where the context states them
- Summarize what raised capital is being allocated to
- Rate compute intent as hot, warm, or cold: hot means explicit GPU/AI infrastructure scaling plans, warm means general AI investment signals, cold means neither
- Quote the strongest piece of evidence for GPU/AI infrastructure spending, or state that none was found

CONTEXT DATA:
{context}

OUTPUT FORMAT (respond in valid JSON only, no extra text):
{
  "investor_types": ["Tier 1 VC"],
  "funding_timeline": [
    { "date_or_round": "Series A (2023)", "amount": "$5M", "investors": ["VC One"] }
  ],
  "capital_allocation_purpose": "1-2 sentence summary",
  "compute_intent": "warm",
  "compute_spending_evidence": "Quoted evidence or a statement that none was found"
}"#;

const REPORT_PROMPT: &str = r#"You are an expert business writer who transforms complex analysis into clear, professional reports. Compile a comprehensive market research report for {company_name}.

You have the following data:

SEARCH CONTEXT:
{context}

SWOT ANALYSIS:
{swot}

MARKET TRENDS:
{trends}

INSTRUCTIONS:
- Write a 2-3 paragraph company overview
- Summarize the competitive landscape in 1-2 paragraphs
- List 5-10 key findings as concise bullet points
- Be professional, clear, and actionable
- Don't fabricate data — only use what's provided

OUTPUT FORMAT (respond in valid JSON only, no extra text):
{
  "company_overview": "2-3 paragraph overview",
  "competitive_landscape": "1-2 paragraph analysis",
  "key_findings": ["finding 1", "finding 2", "finding 3"]
}"#;

const FOLLOWUP_SYSTEM_PROMPT: &str = r#"You are a research assistant answering follow-up questions about {company_name} and only {company_name}. Never switch to a different company, even if the question seems to mention one.

RULES:
- Answer directly and concisely; no preamble, no meta-commentary
- Every factual claim taken from the LIVE WEB CONTEXT must carry a citation marker like [1] matching the numbered source
- If the provided context does not contain the answer, say so plainly
- Output only the final answer

REPORT CONTEXT:
{report_context}

LIVE WEB CONTEXT:
{live_context}"#;

const STRICT_CITATION_PROMPT: &str = r#"Your previous answer lacked citations. Answer the question again using ONLY the numbered live web context below. Every factual bullet or sentence must end with a citation marker like [1]. If the context does not support an answer, say exactly that.

QUESTION: {question}

LIVE WEB CONTEXT:
{live_context}"#;

const LEAK_REWRITE_PROMPT: &str = r#"Rewrite the following draft as a clean final answer. Output only the final answer text: no reasoning, no self-talk, no notes about the task. Keep all citation markers like [1] intact.

DRAFT:
{draft}"#;

const SUGGESTIONS_PROMPT: &str = r#"Based on this research report about {company_name}, suggest 3 sharp follow-up questions a sales or strategy reader would ask next. Return them as a numbered list, one per line, nothing else.

REPORT SUMMARY:
{report_context}"#;

pub fn swot(subject: &str, context: &str) -> String {
    SWOT_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
}

pub fn trends(subject: &str, context: &str) -> String {
    TRENDS_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
}

pub fn leaders(subject: &str, context: &str) -> String {
    LEADERS_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
}

pub fn icp_fit(subject: &str, context: &str) -> String {
    ICP_FIT_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
}

pub fn financials(subject: &str, context: &str) -> String {
    FINANCIALS_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
}

pub fn funding(subject: &str, context: &str) -> String {
    FUNDING_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
}

pub fn report(subject: &str, context: &str, swot_json: &str, trends_json: &str) -> String {
    REPORT_PROMPT
        .replace("{company_name}", subject)
        .replace("{context}", context)
        .replace("{swot}", swot_json)
        .replace("{trends}", trends_json)
}

/// System instruction for a follow-up answer. `live_context` should be the
/// literal `"None"` marker when no live evidence was obtainable.
pub fn followup_system(subject: &str, report_context: &str, live_context: &str) -> String {
    FOLLOWUP_SYSTEM_PROMPT
        .replace("{company_name}", subject)
        .replace("{report_context}", report_context)
        .replace("{live_context}", live_context)
}

pub fn strict_citation(question: &str, live_context: &str) -> String {
    STRICT_CITATION_PROMPT
        .replace("{question}", question)
        .replace("{live_context}", live_context)
}

pub fn leak_rewrite(draft: &str) -> String {
    LEAK_REWRITE_PROMPT.replace("{draft}", draft)
}

pub fn suggestions(subject: &str, report_context: &str) -> String {
    SUGGESTIONS_PROMPT
        .replace("{company_name}", subject)
        .replace("{report_context}", report_context)
}
