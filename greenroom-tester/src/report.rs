//! Report rendering for script runs, exploration sweeps, and validation.

use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use crate::explore::ExploreOutcome;
use crate::runner::{RunReport, RunStatus};
use crate::validate::ValidationReport;

pub fn console_run_report(out: &mut dyn Write, reports: &[RunReport]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Script Run Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;

    let passed = reports.iter().filter(|r| r.passed()).count();
    writeln!(out, "Total scripts: {}", reports.len())?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(
        out,
        "Failed: {}",
        (reports.len() - passed).to_string().red()
    )?;
    writeln!(out)?;

    for report in reports {
        let status = match report.status {
            RunStatus::Passed => "✅ PASS".green(),
            RunStatus::Failed => "❌ FAIL".red(),
            RunStatus::Softlocked => "🔒 SOFTLOCK".yellow(),
        };
        writeln!(out, "{} {}", status, report.name.bold())?;
        writeln!(
            out,
            "   Steps: {}  Final scene: {}  Ended: {}  ({}ms)",
            report.steps_executed, report.final_scene, report.ended, report.duration_ms
        )?;
        if let Some(softlock) = &report.softlock {
            writeln!(out, "   Softlock: {}", softlock.to_string().yellow())?;
        }
        for failure in &report.failures {
            writeln!(
                out,
                "   • step {} [{}]: expected {}, got {}",
                failure.step,
                failure.check,
                failure.expected,
                failure.actual.red()
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn json_run_report(out: &mut dyn Write, reports: &[RunReport]) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(reports)?)?;
    Ok(())
}

pub fn markdown_run_report(out: &mut dyn Write, reports: &[RunReport]) -> Result<()> {
    writeln!(out, "# Greenroom Script Run Results\n")?;
    let passed = reports.iter().filter(|r| r.passed()).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scripts**: {}", reports.len())?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}\n", reports.len() - passed)?;

    writeln!(out, "## Detailed Results\n")?;
    for report in reports {
        let status = match report.status {
            RunStatus::Passed => "✅",
            RunStatus::Failed => "❌",
            RunStatus::Softlocked => "🔒",
        };
        writeln!(out, "### {} {}\n", status, report.name)?;
        writeln!(out, "- **Steps executed**: {}", report.steps_executed)?;
        writeln!(out, "- **Final scene**: `{}`", report.final_scene)?;
        writeln!(out, "- **Reached ending**: {}", report.ended)?;
        if let Some(softlock) = &report.softlock {
            writeln!(out, "- **Softlock**: {softlock}")?;
        }
        if !report.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &report.failures {
                writeln!(
                    out,
                    "  - step {} [{}]: expected {}, got {}",
                    failure.step, failure.check, failure.expected, failure.actual
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn console_explore_report(out: &mut dyn Write, outcomes: &[ExploreOutcome]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🎲 Exploration Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "======================".cyan())?;
    let clean = outcomes.iter().filter(|o| o.is_clean()).count();
    writeln!(out, "Walks: {}  Clean: {}", outcomes.len(), clean)?;
    writeln!(out)?;
    for outcome in outcomes {
        match &outcome.softlock {
            None => writeln!(
                out,
                "{} seed {} - {} steps, ended={} at {}",
                "✅".green(),
                outcome.seed,
                outcome.steps,
                outcome.ended,
                outcome.final_scene
            )?,
            Some(kind) => {
                writeln!(
                    out,
                    "{} seed {} - {} after {} steps at {}",
                    "🔒".yellow(),
                    outcome.seed,
                    kind.to_string().yellow(),
                    outcome.steps,
                    outcome.final_scene
                )?;
                writeln!(out, "   path: {}", outcome.path.join(" → "))?;
            }
        }
    }
    Ok(())
}

pub fn json_explore_report(out: &mut dyn Write, outcomes: &[ExploreOutcome]) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(outcomes)?)?;
    Ok(())
}

pub fn markdown_explore_report(out: &mut dyn Write, outcomes: &[ExploreOutcome]) -> Result<()> {
    writeln!(out, "# Greenroom Exploration Results\n")?;
    writeln!(out, "| Seed | Steps | Ended | Final scene | Softlock |")?;
    writeln!(out, "|------|-------|-------|-------------|----------|")?;
    for outcome in outcomes {
        writeln!(
            out,
            "| {} | {} | {} | `{}` | {} |",
            outcome.seed,
            outcome.steps,
            outcome.ended,
            outcome.final_scene,
            outcome
                .softlock
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string)
        )?;
    }
    writeln!(out)?;
    Ok(())
}

pub fn console_validation_report(out: &mut dyn Write, report: &ValidationReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🧭 Content Validation".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(
        out,
        "Content {} starting at {}",
        report.content_version, report.starting_scene
    )?;
    writeln!(
        out,
        "Scenes: {} declared, {} loaded, {} reachable",
        report.declared_scenes,
        report.loaded_scenes,
        report.reachability.reachable.len()
    )?;
    if report.reachability.truncated {
        writeln!(out, "{}", "⚠️  traversal hit the depth bound".yellow())?;
    }
    for problem in &report.problems {
        writeln!(out, "{} {}: {}", "❌".red(), problem.scene_id, problem.message)?;
    }
    for unreachable in &report.reachability.unreachable {
        writeln!(
            out,
            "{} {} is unreachable ({})",
            "⚠️".yellow(),
            unreachable.scene_id,
            unreachable.reason.as_str()
        )?;
    }
    if !report.cycles.is_empty() {
        writeln!(out, "Cycles (informational):")?;
        for (scene_id, length) in &report.cycles.members {
            writeln!(out, "   {scene_id} (shortest cycle: {length})")?;
        }
    }
    writeln!(
        out,
        "{}",
        if report.is_clean() {
            "✅ content is structurally sound".green()
        } else {
            "❌ content has structural problems".red()
        }
    )?;
    Ok(())
}

pub fn json_validation_report(out: &mut dyn Write, report: &ValidationReport) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(report)?)?;
    Ok(())
}

pub fn markdown_validation_report(out: &mut dyn Write, report: &ValidationReport) -> Result<()> {
    writeln!(out, "# Greenroom Content Validation\n")?;
    writeln!(out, "- **Content version**: {}", report.content_version)?;
    writeln!(out, "- **Starting scene**: `{}`", report.starting_scene)?;
    writeln!(out, "- **Declared scenes**: {}", report.declared_scenes)?;
    writeln!(out, "- **Loaded scenes**: {}", report.loaded_scenes)?;
    writeln!(
        out,
        "- **Reachable scenes**: {}\n",
        report.reachability.reachable.len()
    )?;
    if !report.problems.is_empty() {
        writeln!(out, "## Problems\n")?;
        for problem in &report.problems {
            writeln!(out, "- `{}`: {}", problem.scene_id, problem.message)?;
        }
        writeln!(out)?;
    }
    if !report.reachability.unreachable.is_empty() {
        writeln!(out, "## Unreachable Scenes\n")?;
        for unreachable in &report.reachability.unreachable {
            writeln!(
                out,
                "- `{}` ({})",
                unreachable.scene_id,
                unreachable.reason.as_str()
            )?;
        }
        writeln!(out)?;
    }
    if !report.cycles.is_empty() {
        writeln!(out, "## Cycles\n")?;
        for (scene_id, length) in &report.cycles.members {
            writeln!(out, "- `{scene_id}` (shortest cycle: {length})")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
