//! Context pack rendering
//!
//! The context pack is the primary output artifact of an analysis run: a
//! single structured text block with fixed numbered sections. Section order
//! and numbering are a stable contract consumed by downstream readers;
//! change them and every consumer breaks.

use std::path::Path;

use crate::analysis::ExplainReport;
use crate::config::{MAX_CONTEXT_PACK_LINES, MAX_EVIDENCE_SNIPPET};
use crate::parse::Severity;

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push("-".repeat(40));
    lines.push(title.to_string());
    lines.push("-".repeat(40));
}

fn clip(text: &str, max: usize) -> String {
    if text.len() > max {
        format!("{}...", &text[..max])
    } else {
        text.to_string()
    }
}

/// Render the context pack for one analysis run
pub fn render(report: &ExplainReport, log_path: &Path, snapshot: &Path) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(60));
    lines.push("STRATA CONTEXT PACK".to_string());
    lines.push("=".repeat(60));
    lines.push(format!("Log: {}", log_path.display()));
    lines.push(String::new());

    // 1. Most likely node
    section(&mut lines, "1. MOST LIKELY FAILING NODE");
    match report.outcome.top() {
        Some(top) => {
            lines.push(format!(
                "Node: {} (confidence: {:.0}%)",
                top.node.display_name,
                top.confidence * 100.0
            ));
            lines.push(format!("Type: {}", top.node.node_type));
            lines.push(format!("Key: {}", top.node.key));
            if let Some(canonical) = &top.node.canonical_path {
                lines.push(format!("Path: {}", snapshot.join(canonical).display()));
            }
        }
        None => lines.push("NO CONFIDENT MATCH - no node scored above zero".to_string()),
    }
    lines.push(String::new());

    // 2. Execution chain
    section(&mut lines, "2. EXECUTION CHAIN");
    if report.upstream.is_empty() && report.downstream.is_empty() {
        lines.push("NOT FOUND in snapshot".to_string());
    } else {
        if report.upstream.is_empty() {
            lines.push("Upstream: (none)".to_string());
        } else {
            lines.push("Upstream (dependencies):".to_string());
            for edge in report.upstream.iter().take(5) {
                lines.push(format!(
                    "  [{}] {} --{}--> (this)",
                    edge.node.node_type, edge.node.key, edge.rel_type
                ));
            }
        }
        if report.downstream.is_empty() {
            lines.push("Downstream: (none)".to_string());
        } else {
            lines.push("Downstream (dependents):".to_string());
            for edge in report.downstream.iter().take(8) {
                lines.push(format!(
                    "  (this) --{}--> [{}] {}",
                    edge.rel_type, edge.node.node_type, edge.node.key
                ));
            }
        }
    }
    lines.push(String::new());

    // 3. Evidence
    section(&mut lines, "3. EVIDENCE (error log lines)");
    if report.analysis.error_lines.is_empty() {
        lines.push("No error signals found in log".to_string());
    } else {
        for signal in report.analysis.error_lines.iter().take(8) {
            lines.push(format!(
                "L{}: {}",
                signal.line_number,
                clip(&signal.message, MAX_EVIDENCE_SNIPPET)
            ));
        }
    }
    if !report.analysis.error_codes.is_empty() {
        lines.push(format!(
            "Error codes: {}",
            report
                .analysis
                .error_codes
                .iter()
                .take(10)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    lines.push(String::new());

    // 4. Decoded codes
    section(&mut lines, "4. DECODED CODES");
    if report.analysis.error_codes.is_empty() {
        lines.push("No codes found in log".to_string());
    } else {
        for code in report.analysis.error_codes.iter().take(10) {
            match report.decoded.get(code) {
                Some(entry) => {
                    lines.push(format!("{} [{}]", code, entry.severity.label()));
                    if let Some(title) = &entry.title {
                        lines.push(format!("  Title: {}", title));
                    }
                    lines.push(format!("  {}", clip(&entry.body, 150)));
                }
                None => {
                    let severity = Severity::from_code(code)
                        .map(|s| s.label())
                        .unwrap_or("Unknown");
                    lines.push(format!("{} [{}] - not in the knowledge base yet", code, severity));
                }
            }
        }
    }
    lines.push(String::new());

    // 5. External signals
    section(&mut lines, "5. EXTERNAL SIGNALS");
    if report.signals.is_empty() {
        lines.push("None found".to_string());
    } else {
        let mut signals: Vec<_> = report.signals.iter().collect();
        signals.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.line_number.cmp(&b.line_number)));
        for signal in signals.iter().take(5) {
            lines.push(format!(
                "[{}] {} ({})",
                signal.severity.label().to_uppercase(),
                signal.rule_id,
                signal.category
            ));
            if !signal.captures.is_empty() {
                let captures = signal
                    .captures
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("  Captures: {}", captures));
            }
            lines.push(format!(
                "  L{}: {}",
                signal.line_number,
                clip(&signal.line_text, 100)
            ));
        }
    }
    lines.push(String::new());

    // 6. Hypotheses
    section(&mut lines, "6. TOP HYPOTHESES");
    for (rank, hypothesis) in report.hypotheses.iter().enumerate() {
        lines.push(format!("{}. {}", rank + 1, hypothesis.text));
        lines.push(format!(
            "   Evidence (L{}): {}",
            hypothesis.line_number, hypothesis.evidence
        ));
        if !hypothesis.confirm_steps.is_empty() {
            lines.push("   How to confirm:".to_string());
            for step in &hypothesis.confirm_steps {
                lines.push(format!("   - {}", step));
            }
        }
        lines.push(String::new());
    }

    // 7. Files to open
    section(&mut lines, "7. FILES TO OPEN");
    if report.related_files.is_empty() {
        lines.push("NOT FOUND in snapshot".to_string());
    } else {
        for rel in &report.related_files {
            lines.push(format!("  {}", snapshot.join(rel).display()));
        }
    }
    lines.push(String::new());

    // 8. Similar past cases
    section(&mut lines, "8. SIMILAR PAST CASES");
    if report.similar_cases.is_empty() {
        lines.push("No similar cases found (or below threshold)".to_string());
    } else {
        for case in &report.similar_cases {
            lines.push(format!(
                "[{}] (match: {:.0}%)",
                case.title.as_deref().unwrap_or("Untitled"),
                case.score * 100.0
            ));
            if let Some(cause) = &case.root_cause {
                lines.push(format!("  Root cause: {}", clip(cause, 80)));
            }
            if let Some(fix) = &case.fix_summary {
                lines.push(format!("  Fix: {}", clip(fix, 80)));
            }
            for command in case.verify_commands.iter().take(2) {
                lines.push(format!("    {}", clip(command, 60)));
            }
        }
    }
    lines.push(String::new());

    lines.push("=".repeat(60));
    lines.push("END OF CONTEXT PACK".to_string());
    lines.push("=".repeat(60));

    // Bound the pack so it stays pasteable
    if lines.len() > MAX_CONTEXT_PACK_LINES {
        let total = lines.len();
        lines.truncate(MAX_CONTEXT_PACK_LINES - 3);
        lines.push("...".to_string());
        lines.push(format!("[Truncated - {} total lines]", total));
        lines.push("=".repeat(60));
    }

    lines.join("\n")
}
