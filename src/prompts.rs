//! Stage prompt templates
//!
//! A [`PromptProvider`] turns a stage plus its input into the persona (system
//! prompt) and the task instruction sent to the model. The pipeline treats
//! the wording as opaque; [`DefaultPrompts`] is the LinkedIn post flavour.

use crate::pipeline::executor::StageInput;
use crate::pipeline::stage::Stage;
use crate::search::SearchHit;
use std::fmt::Write;

/// Builds stage prompts from topic and context
pub trait PromptProvider: Send + Sync {
    /// System prompt describing the agent that performs `stage`
    fn persona(&self, stage: Stage) -> String;

    /// Task instruction for `stage`. `hits` is only non-empty for research.
    fn instruction(&self, stage: Stage, input: &StageInput, hits: &[SearchHit]) -> String;
}

/// LinkedIn post prompts
#[derive(Debug, Clone, Default)]
pub struct DefaultPrompts;

impl DefaultPrompts {
    pub fn new() -> Self {
        Self
    }

    fn context_section(input: &StageInput, stage: Stage, heading: &str) -> String {
        match input.context.get(&stage) {
            Some(text) => format!("## {heading}\n\n{text}\n\n"),
            None => String::new(),
        }
    }

    fn render_hits(hits: &[SearchHit]) -> String {
        if hits.is_empty() {
            return "No live search results are available. Rely on your own knowledge and \
                    say so where recency matters.\n\n"
                .to_string();
        }

        let mut rendered = format!("## Search results ({} unique sources)\n\n", hits.len());
        for (idx, hit) in hits.iter().enumerate() {
            let _ = writeln!(rendered, "{}. {}\n   {}\n   {}", idx + 1, hit.title, hit.url, hit.snippet);
            if let Some(query) = &hit.query {
                let _ = writeln!(rendered, "   (query: {query})");
            }
        }
        rendered.push('\n');
        rendered
    }
}

impl PromptProvider for DefaultPrompts {
    fn persona(&self, stage: Stage) -> String {
        match stage {
            Stage::Research => "You are an expert researcher covering artificial intelligence, \
                software development and technology trends. You gather current information \
                from several angles and always cite your sources."
                .to_string(),
            Stage::Analysis => "You are a senior technology analyst. You find the patterns and \
                insights in a body of research that will resonate with tech professionals on \
                LinkedIn, and you turn complex topics into clear narratives."
                .to_string(),
            Stage::Writing => "You are an experienced LinkedIn content creator for technology \
                topics. You hook readers in the first line, keep paragraphs short, use hashtags \
                sparingly and end with a question or call to action."
                .to_string(),
            Stage::Critique => "You are a meticulous content strategist. You judge posts on \
                accuracy, narrative flow, engagement, accessibility and LinkedIn best practice, \
                and your feedback is specific and actionable."
                .to_string(),
            Stage::Editing => "You are a skilled editor who turns good posts into great ones. \
                You apply feedback while preserving the core insight and the author's voice."
                .to_string(),
        }
    }

    fn instruction(&self, stage: Stage, input: &StageInput, hits: &[SearchHit]) -> String {
        let topic = &input.topic;
        match stage {
            Stage::Research => format!(
                "Research the topic: '{topic}'\n\n\
                 {results}\
                 Deliver a comprehensive research report covering:\n\
                 - Key findings and trends\n\
                 - Notable developments and breakthroughs\n\
                 - Industry impact and implications\n\
                 - Expert insights and perspectives\n\
                 - Relevant statistics and data points\n\
                 - Source citations",
                results = Self::render_hits(hits),
            ),
            Stage::Analysis => format!(
                "Analyze the research on '{topic}' and synthesize insights for a LinkedIn post.\n\n\
                 {research}\
                 Deliver:\n\
                 - The core narrative or angle for the post\n\
                 - 2-3 key insights to feature\n\
                 - Supporting data points and examples\n\
                 - Suggested tone and approach\n\
                 - Potential hooks and calls to action",
                research = Self::context_section(input, Stage::Research, "Research report"),
            ),
            Stage::Writing => format!(
                "Write an engaging LinkedIn post about '{topic}' based on this analysis.\n\n\
                 {analysis}\
                 Requirements:\n\
                 1. Open with a line that grabs attention\n\
                 2. Short paragraphs of 2-3 lines\n\
                 3. Technical but not jargon-heavy\n\
                 4. 150-250 words\n\
                 5. End with a question or call to action\n\
                 6. 3-5 relevant hashtags at the end\n\n\
                 Reply with the complete post only.",
                analysis = Self::context_section(input, Stage::Analysis, "Analysis"),
            ),
            Stage::Critique => format!(
                "Critically evaluate this LinkedIn post draft about '{topic}'.\n\n\
                 {draft}\
                 Assess hook, value, clarity, accuracy, structure, engagement, platform fit, \
                 authenticity, length and hashtags.\n\n\
                 Provide:\n\
                 - An overall line formatted exactly as `Score: N/10`\n\
                 - Strengths to preserve\n\
                 - Weaknesses to address, in priority order\n\
                 - Whether the post is ready to publish or needs revision",
                draft = Self::context_section(input, Stage::Writing, "Draft"),
            ),
            Stage::Editing => format!(
                "Refine the LinkedIn post about '{topic}' using the critique \
                 (iteration {iteration}).\n\n\
                 {draft}{critique}\
                 Keep what works, fix the high-priority issues first and preserve the core \
                 message. Reply with the complete revised post only.",
                iteration = input.iteration,
                draft = Self::context_section(input, Stage::Writing, "Current draft"),
                critique = Self::context_section(input, Stage::Critique, "Critique"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::StageContext;

    fn input(topic: &str, context: StageContext) -> StageInput {
        StageInput {
            topic: topic.to_string(),
            iteration: 2,
            context,
        }
    }

    #[test]
    fn test_every_stage_has_a_persona() {
        let prompts = DefaultPrompts::new();
        for stage in Stage::ALL {
            assert!(!prompts.persona(stage).is_empty());
        }
    }

    #[test]
    fn test_research_prompt_includes_hits() {
        let hits = vec![SearchHit {
            title: "Edge AI report".to_string(),
            snippet: "Latency drops".to_string(),
            url: "https://example.com/edge".to_string(),
            query: Some("Edge computing latest trends".to_string()),
        }];

        let prompt = DefaultPrompts::new().instruction(
            Stage::Research,
            &input("Edge computing", StageContext::new()),
            &hits,
        );

        assert!(prompt.contains("'Edge computing'"));
        assert!(prompt.contains("https://example.com/edge"));
        assert!(prompt.contains("1 unique sources"));
    }

    #[test]
    fn test_research_prompt_without_hits_mentions_fallback() {
        let prompt =
            DefaultPrompts::new().instruction(Stage::Research, &input("Rust", StageContext::new()), &[]);
        assert!(prompt.contains("No live search results"));
    }

    #[test]
    fn test_editing_prompt_carries_draft_critique_and_iteration() {
        let mut context = StageContext::new();
        context.insert(Stage::Writing, "DRAFT BODY".to_string());
        context.insert(Stage::Critique, "CRITIQUE BODY".to_string());

        let prompt = DefaultPrompts::new().instruction(Stage::Editing, &input("Rust", context), &[]);

        assert!(prompt.contains("DRAFT BODY"));
        assert!(prompt.contains("CRITIQUE BODY"));
        assert!(prompt.contains("iteration 2"));
    }
}
