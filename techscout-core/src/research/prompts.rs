//! Prompt builders for each research phase.
//!
//! Pure functions of their inputs: the same topic and prior outputs always
//! produce the same text. Prior outputs are embedded verbatim. Word limits
//! are instructions to the model; nothing here truncates input.

use super::session::Phase;
use crate::config::DEFAULT_ORGANIZATION;

/// Outputs of the first three phases, threaded into the summary prompt.
#[derive(Debug, Clone, Copy)]
pub struct PriorOutputs<'a> {
    pub market_research: &'a str,
    pub vendor_analysis: &'a str,
    pub hype_cycle: &'a str,
}

/// Label the hype-cycle prompt asks the model to put the stage on.
pub const STAGE_LINE_LABEL: &str = "Current Stage:";

/// Marker the summary prompt asks the model to head its summary with.
pub const SUMMARY_HEADING: &str = "**EXECUTIVE SUMMARY**";

fn word_limit(phase: Phase) -> String {
    format!(
        "Keep the response under {} words.",
        phase.policy().max_words
    )
}

/// Phase 1: market landscape. Depends on nothing but the topic.
pub fn market_research_prompt(topic: &str) -> String {
    format!(
        "You are a senior enterprise technology analyst conducting market research.

Technology Area: {topic}

Provide a structured analysis with these sections:

1. **Market Overview**: market size, growth trajectory, adoption drivers, maturity indicators
2. **Technology Landscape**: core capabilities, common use cases, architecture patterns
3. **Adoption Trends**: adoption by industry vertical, enterprise versus SMB patterns, regional differences
4. **Key Players**: established leaders, emerging challengers, platform owners
5. **Business Impact**: value proposition, ROI drivers, risks and challenges

Use clear section headings and focus on implications for enterprise architecture decisions.
{limit}",
        limit = word_limit(Phase::MarketResearch)
    )
}

/// Phase 2: vendor ecosystem, grounded in the market research text.
pub fn vendor_analysis_prompt(topic: &str, market_research: &str) -> String {
    format!(
        "You are an enterprise architecture analyst specializing in vendor evaluation.

Technology Area: {topic}

Market Context:
{market_research}

Analyze the vendor ecosystem with these sections:

1. **Market Leaders**: the top established vendors, their positioning, strengths and weaknesses
2. **Emerging Players**: startups and challengers with distinctive value propositions
3. **Platform Ecosystem**: integration capabilities, partner networks, developer community
4. **Competitive Dynamics**: differentiation strategies and price/value positioning
5. **Evaluation Framework**: selection criteria and recommendations, considering People, Process, Platform and Price

Focus on practical enterprise purchasing decisions.
{limit}",
        limit = word_limit(Phase::VendorAnalysis)
    )
}

/// Phase 3: hype-cycle positioning. Embeds the market research only.
pub fn hype_cycle_prompt(topic: &str, market_research: &str) -> String {
    format!(
        "You are a senior technology analyst preparing a hype cycle assessment.

Technology Area: {topic}

Market Research Context:
{market_research}

Start your answer with a single line of the form
{STAGE_LINE_LABEL} <stage>
where <stage> is exactly one of: Innovation Trigger, Peak of Inflated Expectations, Trough of Disillusionment, Slope of Enlightenment, Plateau of Productivity.

Then cover:

1. **Position Assessment**: why {topic} sits at that stage and which way it is moving
2. **Timeline**: expected time to mainstream adoption and the milestones along the way
3. **Risks and Opportunities**: implementation risk at the current maturity, advantages for early or late adopters
4. **Recommendations**: when to evaluate, when to pilot, when to implement

{limit}",
        limit = word_limit(Phase::HypeCycle)
    )
}

/// Phase 4: executive whitepaper built from all three prior outputs.
///
/// A blank `organization` falls back to "Your Organization".
pub fn summary_prompt(topic: &str, organization: &str, prior: &PriorOutputs<'_>) -> String {
    let organization = if organization.trim().is_empty() {
        DEFAULT_ORGANIZATION
    } else {
        organization
    };
    format!(
        "You are an enterprise architect writing an executive-level strategic technology whitepaper.

Technology: {topic}
Organization: {organization}

Research Foundation:
Market Research: {market}
Vendor Analysis: {vendor}
Hype Cycle Analysis: {hype}

Structure the whitepaper as follows:

{SUMMARY_HEADING}
- Key findings and strategic recommendations
- Business impact and implementation timeline

**1. TECHNOLOGY OVERVIEW**
**2. MARKET LANDSCAPE**
**3. ENTERPRISE IMPLICATIONS**
**4. VENDOR ECOSYSTEM EVALUATION**
**5. IMPLEMENTATION STRATEGY**
**6. FINANCIAL ANALYSIS**
**7. RECOMMENDATIONS AND NEXT STEPS**

Write for executives: clear sections, plain language, actionable recommendations.
{limit}",
        market = prior.market_research,
        vendor = prior.vendor_analysis,
        hype = prior.hype_cycle,
        limit = word_limit(Phase::Summary)
    )
}

/// Source of phase prompts used by the pipeline.
///
/// The default methods delegate to the free functions in this module;
/// implementors override only what they need.
pub trait PromptSet: Send + Sync {
    fn market_research(&self, topic: &str) -> String {
        market_research_prompt(topic)
    }

    fn vendor_analysis(&self, topic: &str, market_research: &str) -> String {
        vendor_analysis_prompt(topic, market_research)
    }

    fn hype_cycle(&self, topic: &str, market_research: &str) -> String {
        hype_cycle_prompt(topic, market_research)
    }

    fn summary(&self, topic: &str, organization: &str, prior: &PriorOutputs<'_>) -> String {
        summary_prompt(topic, organization, prior)
    }
}

/// The built-in prompt wording.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPrompts;

impl PromptSet for StandardPrompts {}
