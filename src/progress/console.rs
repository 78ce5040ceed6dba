//! Human-facing progress output on stdout

use crate::pipeline::orchestrator::{render_artifact, RunMetadata};
use crate::pipeline::stage::Stage;
use crate::progress::{ProgressEvent, ProgressKind, ProgressSink};
use async_trait::async_trait;
use std::fmt::Write;

const RULE_WIDTH: usize = 70;
const PANEL_WIDTH: usize = 68;

/// Prints step indicators and, with `show_thinking`, every draft and critique
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    show_thinking: bool,
}

impl ConsoleReporter {
    pub fn new(show_thinking: bool) -> Self {
        Self { show_thinking }
    }

    pub fn header() -> String {
        let border = "═".repeat(PANEL_WIDTH - 2);
        format!(
            "╔{border}╗\n  postcrew: LinkedIn post generator\n  research → analysis → writing → critique ⟲ editing\n╚{border}╝"
        )
    }

    pub fn section(title: &str) -> String {
        format!("\n{title}\n{}", "─".repeat(60))
    }

    /// Text for one event, or `None` when the event prints nothing
    pub fn render(&self, kind: &ProgressKind) -> Option<String> {
        match kind {
            ProgressKind::RunStarted {
                topic,
                max_iterations,
            } => Some(format!(
                "  → System: Topic: {topic}\n  → System: Max Iterations: {max_iterations}"
            )),
            ProgressKind::StageStarted { stage, .. } => Some(Self::stage_started(*stage)),
            ProgressKind::StageCompleted { stage, output, .. } => {
                self.stage_completed(*stage, output)
            }
            ProgressKind::IterationStarted {
                iteration,
                max_iterations,
            } => Some(if *iteration == 0 {
                format!("\nStep 4/5: Refinement Loop (up to {max_iterations} iterations)")
            } else {
                Self::panel(
                    "🔄 Refinement Cycle",
                    &format!("Iteration {iteration} of {max_iterations}"),
                )
            }),
            ProgressKind::CritiqueReceived { critique, .. } => self
                .show_thinking
                .then(|| Self::panel("🔍 Content Critique", critique)),
            // Critique rounds count from 1 on screen
            ProgressKind::QualityThresholdMet { iteration } => Some(format!(
                "✅ Post quality threshold met at iteration {}!",
                iteration + 1
            )),
            ProgressKind::DraftRevised { iteration, draft } => self.show_thinking.then(|| {
                Self::panel(&format!("📝 Draft after Iteration {iteration}"), draft)
            }),
            ProgressKind::RefinementCompleted {
                iterations_used, ..
            } => Some(format!(
                "✅ Refinement loop completed ({iterations_used} iteration(s) used)\n\nStep 5/5: Finalization"
            )),
            ProgressKind::RunCompleted { location, .. } => {
                Some(format!("✅ Saved to: {location}"))
            }
            // The CLI reports failures and cancellation itself
            ProgressKind::RunFailed { .. } | ProgressKind::RunCancelled { .. } => None,
        }
    }

    fn stage_started(stage: Stage) -> String {
        match stage {
            Stage::Research => {
                "\nStep 1/5: Research Phase\n  → Research Agent: Initiating multi-query web search..."
                    .to_string()
            }
            Stage::Analysis => {
                "\nStep 2/5: Analysis Phase\n  → Analyst Agent: Synthesizing research findings..."
                    .to_string()
            }
            Stage::Writing => {
                "\nStep 3/5: Writing Phase\n  → Writer Agent: Crafting LinkedIn post draft..."
                    .to_string()
            }
            Stage::Critique => "  → Critic Agent: Evaluating post quality...".to_string(),
            Stage::Editing => "  → Editor Agent: Refining based on feedback...".to_string(),
        }
    }

    fn stage_completed(&self, stage: Stage, output: &str) -> Option<String> {
        match stage {
            Stage::Research => Some("✅ Research phase completed".to_string()),
            Stage::Analysis => Some("✅ Analysis phase completed".to_string()),
            Stage::Writing => {
                let mut text = "✅ Initial draft completed".to_string();
                if self.show_thinking {
                    text.push('\n');
                    text.push_str(&Self::panel("📝 Initial Draft", output));
                }
                Some(text)
            }
            // Critique and edit results print through their own events
            Stage::Critique | Stage::Editing => None,
        }
    }

    /// Boxed block with a title line
    pub fn panel(title: &str, body: &str) -> String {
        let rule = "─".repeat(PANEL_WIDTH);
        let mut panel = format!("┌{rule}\n│ {title}\n├{rule}\n");
        for line in body.lines() {
            let _ = writeln!(panel, "│ {line}");
        }
        panel.push_str(&format!("└{rule}"));
        panel
    }

    /// The final post followed by a metadata table
    pub fn render_final_output(post: &str, metadata: &RunMetadata) -> String {
        let rule = "═".repeat(RULE_WIDTH);
        let mut out = format!("\n{rule}\n");
        out.push_str(&Self::panel("🎉 Final LinkedIn Post", post));

        let rows = [
            ("Topic", metadata.topic.clone()),
            (
                "Generated At",
                metadata.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            (
                "Duration",
                format!("{:.1} seconds", metadata.duration.as_secs_f64()),
            ),
            ("Iterations", metadata.iterations_used.to_string()),
            ("Model", metadata.model.clone()),
        ];
        out.push_str("\n\n📊 Generation Metadata\n");
        for (key, value) in rows {
            let _ = writeln!(out, "  {key:<14} {value}");
        }
        out.push_str(&rule);
        out
    }

    /// Print the final post; used both after a save and when saving failed
    pub fn print_final_output(post: &str, metadata: &RunMetadata) {
        println!("{}", Self::render_final_output(post, metadata));
    }

    /// Print the full artifact layout so nothing is lost when it could not be saved
    pub fn print_unsaved_artifact(post: &str, metadata: &RunMetadata) {
        println!("{}", render_artifact(post, metadata));
    }
}

#[async_trait]
impl ProgressSink for ConsoleReporter {
    async fn emit(&self, event: ProgressEvent) {
        if let Some(text) = self.render(&event.kind) {
            println!("{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::time::Duration;

    #[test]
    fn test_step_indicators() {
        let reporter = ConsoleReporter::new(false);
        let text = reporter
            .render(&ProgressKind::StageStarted {
                stage: Stage::Analysis,
                iteration: 0,
            })
            .unwrap();
        assert!(text.contains("Step 2/5: Analysis Phase"));
    }

    #[test]
    fn test_thinking_panels_follow_flag() {
        let critique = ProgressKind::CritiqueReceived {
            iteration: 1,
            critique: "Score: 6/10".to_string(),
        };
        assert!(ConsoleReporter::new(false).render(&critique).is_none());

        let text = ConsoleReporter::new(true).render(&critique).unwrap();
        assert!(text.contains("Content Critique"));
        assert!(text.contains("│ Score: 6/10"));
    }

    #[test]
    fn test_quality_met_on_first_critique_reads_iteration_one() {
        let text = ConsoleReporter::new(false)
            .render(&ProgressKind::QualityThresholdMet { iteration: 0 })
            .unwrap();
        assert_eq!(text, "✅ Post quality threshold met at iteration 1!");
    }

    #[test]
    fn test_cancellation_prints_nothing() {
        let reporter = ConsoleReporter::new(true);
        assert!(reporter
            .render(&ProgressKind::RunCancelled {
                stage: Some(Stage::Editing)
            })
            .is_none());
    }

    #[test]
    fn test_failure_prints_nothing() {
        let reporter = ConsoleReporter::new(true);
        assert!(reporter
            .render(&ProgressKind::RunFailed {
                stage: Some(Stage::Research),
                iteration: Some(0),
                error: "boom".to_string(),
            })
            .is_none());
    }

    #[test]
    fn test_final_output_has_metadata_rows() {
        let metadata = RunMetadata {
            topic: "Edge computing".to_string(),
            generated_at: Local::now(),
            duration: Duration::from_secs_f64(12.34),
            iterations_used: 2,
            model: "claude-sonnet-4-5-20250929".to_string(),
        };

        let text = ConsoleReporter::render_final_output("Hello LinkedIn", &metadata);
        assert!(text.contains("│ Hello LinkedIn"));
        assert!(text.contains("12.3 seconds"));
        assert!(text.contains("Iterations"));
        assert!(text.contains("Edge computing"));
    }
}
