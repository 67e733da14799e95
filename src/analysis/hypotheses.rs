//! Hypothesis ranker
//!
//! Merges external signals, decoded message codes, and noise-suppressed
//! error lines into a priority-ordered explanation list. Tiers are strict:
//! a higher tier always outranks a lower one regardless of count.
//!
//! 1. External signals with Fatal severity (configuration / external-system
//!    evidence).
//! 2. Fatal-severity message codes (trailing letter F).
//! 3. Error-severity message codes and non-fatal external signals.
//! 4. Wrapper/launcher noise, informational only, never promoted. A log
//!    containing nothing else yields an explicit "no root cause code found"
//!    placeholder instead of the noise line.
//!
//! Within a tier, order is stable by first appearance in the log.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::MAX_EVIDENCE_SNIPPET;
use crate::parse::{LogAnalysis, Severity};
use crate::rules::ExternalSignal;
use crate::store::MessageCode;

/// Priority tier, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HypothesisTier {
    ExternalFatal,
    FatalCode,
    ErrorEvidence,
    WrapperNoise,
    Placeholder,
}

/// One ranked explanation
#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub tier: HypothesisTier,
    pub text: String,
    pub evidence: String,
    pub line_number: usize,
    pub confirm_steps: Vec<String>,
    pub confidence: f64,
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() > max {
        format!("{}...", &text[..max])
    } else {
        text.to_string()
    }
}

/// First log line that carries the given code, for evidence/ordering
fn code_line(analysis: &LogAnalysis, code: &str) -> (usize, String) {
    match analysis.first_line_with_code(code) {
        Some(line) => (line.line_number, truncate(&line.message, MAX_EVIDENCE_SNIPPET)),
        None => (0, format!("code {code} extracted from log")),
    }
}

fn signal_hypothesis(signal: &ExternalSignal, tier: HypothesisTier, confidence: f64) -> Hypothesis {
    let text = signal.rendered_hypothesis().unwrap_or_else(|| {
        format!(
            "External signal {} ({}) detected",
            signal.rule_id, signal.category
        )
    });
    Hypothesis {
        tier,
        text,
        evidence: format!(
            "L{}: {}",
            signal.line_number,
            truncate(&signal.line_text, MAX_EVIDENCE_SNIPPET)
        ),
        line_number: signal.line_number,
        confirm_steps: signal
            .hints
            .iter()
            .map(|hint| {
                let mut step = hint.clone();
                for (key, value) in &signal.captures {
                    step = step.replace(&format!("{{{}}}", key), value);
                }
                step
            })
            .collect(),
        confidence,
    }
}

fn code_hypothesis(
    analysis: &LogAnalysis,
    decoded: &BTreeMap<String, MessageCode>,
    code: &str,
    tier: HypothesisTier,
    confidence: f64,
) -> Hypothesis {
    let (line_number, evidence) = code_line(analysis, code);
    let severity = Severity::from_code(code).unwrap_or(Severity::Error);

    let (text, confirm_steps) = match decoded.get(code) {
        Some(entry) => {
            let headline = entry.title.clone().unwrap_or_else(|| {
                truncate(&entry.body, 80)
            });
            (
                format!("{} [{}]: {}", code, severity.label(), headline),
                vec![
                    truncate(&entry.body, 160),
                    format!("Inspect the log around line {line_number}"),
                ],
            )
        }
        None => (
            format!(
                "{} [{}] reported (code not in the knowledge base yet)",
                code,
                severity.label()
            ),
            vec![
                format!("Import the code listing, then re-run to decode {code}"),
                format!("Inspect the log around line {line_number}"),
            ],
        ),
    };

    Hypothesis {
        tier,
        text,
        evidence,
        line_number,
        confirm_steps,
        confidence,
    }
}

/// Rank hypotheses from signals, decoded codes, and the analysis facts.
/// Returns at most `max` entries.
pub fn rank_hypotheses(
    signals: &[ExternalSignal],
    decoded: &BTreeMap<String, MessageCode>,
    analysis: &LogAnalysis,
    max: usize,
) -> Vec<Hypothesis> {
    let mut hypotheses: Vec<Hypothesis> = Vec::new();
    let mut seen_rules: BTreeSet<&str> = BTreeSet::new();

    // Tier 1: Fatal external signals, first occurrence per rule
    let mut fatal_signals: Vec<&ExternalSignal> = signals
        .iter()
        .filter(|s| s.severity == Severity::Fatal)
        .collect();
    fatal_signals.sort_by_key(|s| s.line_number);
    for signal in fatal_signals {
        if seen_rules.insert(&signal.rule_id) {
            hypotheses.push(signal_hypothesis(signal, HypothesisTier::ExternalFatal, 0.95));
        }
    }

    // Tier 2: Fatal-severity codes (trailing letter F)
    let mut fatal_codes: Vec<&str> = analysis
        .error_codes
        .iter()
        .map(String::as_str)
        .filter(|code| Severity::from_code(code) == Some(Severity::Fatal))
        .collect();
    fatal_codes.sort_by_key(|code| code_line(analysis, code).0);
    for code in fatal_codes {
        hypotheses.push(code_hypothesis(analysis, decoded, code, HypothesisTier::FatalCode, 0.9));
    }

    // Tier 3: Error-severity codes and non-fatal external signals, merged
    // by first appearance
    let mut tier3: Vec<Hypothesis> = Vec::new();
    for code in &analysis.error_codes {
        let is_error = Severity::from_code(code) == Some(Severity::Error)
            || code.starts_with("ORA-");
        if is_error {
            tier3.push(code_hypothesis(
                analysis,
                decoded,
                code,
                HypothesisTier::ErrorEvidence,
                0.75,
            ));
        }
    }
    for signal in signals {
        if signal.severity != Severity::Fatal && seen_rules.insert(&signal.rule_id) {
            tier3.push(signal_hypothesis(signal, HypothesisTier::ErrorEvidence, 0.8));
        }
    }
    tier3.sort_by_key(|h| h.line_number);
    hypotheses.extend(tier3);

    // Tier 4: wrapper noise, informational only. Never a root cause.
    if hypotheses.is_empty() {
        if analysis.has_wrapper_noise {
            hypotheses.push(Hypothesis {
                tier: HypothesisTier::Placeholder,
                text: "No root cause code found: only the launcher wrapper's generic \
                       non-zero-exit complaint is present"
                    .to_string(),
                evidence: "wrapper noise detected, no decodable error code or external signal"
                    .to_string(),
                line_number: 0,
                confirm_steps: vec![
                    "Review the full log manually for an uncoded failure".to_string(),
                    "Check the upstream job's log for the real failure".to_string(),
                ],
                confidence: 0.3,
            });
        } else {
            hypotheses.push(Hypothesis {
                tier: HypothesisTier::Placeholder,
                text: "No root cause code found: review the log manually".to_string(),
                evidence: "no error code, external signal, or wrapper complaint extracted"
                    .to_string(),
                line_number: 0,
                confirm_steps: vec![
                    "Search the log for ERROR or FAIL keywords".to_string(),
                    "Check timestamps for where processing stopped".to_string(),
                ],
                confidence: 0.3,
            });
        }
    } else if analysis.has_wrapper_noise {
        hypotheses.push(Hypothesis {
            tier: HypothesisTier::WrapperNoise,
            text: "FYI: the launcher wrapper reported a non-zero exit (generic, demoted)"
                .to_string(),
            evidence: "ERROR: Generator returns a non-zero value".to_string(),
            line_number: 0,
            confirm_steps: vec![
                "Treat the entries above as the root-cause candidates".to_string(),
            ],
            confidence: 0.2,
        });
    }

    // Tiers are already strictly ordered by construction; enforce and bound
    hypotheses.sort_by(|a, b| a.tier.cmp(&b.tier).then(a.line_number.cmp(&b.line_number)));
    hypotheses.truncate(max.max(1));
    hypotheses
}
