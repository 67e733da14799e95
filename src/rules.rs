//! External-signal rule engine
//!
//! Rules detect external-system and configuration failures (missing lookup
//! keys, API errors, refused connections, auth failures) that the legacy
//! message codes never express. The rule set is configuration: it is loaded
//! once per analysis run and validated eagerly, so a malformed pattern is a
//! configuration error reported before any log is examined, never a
//! silently dropped rule.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::parse::Severity;

/// Built-in rule set, used when no `--rules` file is given
const DEFAULT_RULES: &str = include_str!("rules_default.json");

/// One rule as written in the configuration file
#[derive(Debug, Deserialize)]
struct RuleSpec {
    id: String,
    category: String,
    severity: String,
    patterns: Vec<String>,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    hypothesis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

/// A validated rule: immutable after load, patterns compiled
#[derive(Debug)]
pub struct SignalRule {
    pub id: String,
    pub category: String,
    pub severity: Severity,
    patterns: Vec<Regex>,
    pub hints: Vec<String>,
    pub hypothesis: Option<String>,
}

/// One rule match against one log line
#[derive(Debug, Clone)]
pub struct ExternalSignal {
    pub rule_id: String,
    pub category: String,
    pub severity: Severity,
    pub captures: BTreeMap<String, String>,
    pub line_number: usize,
    pub line_text: String,
    pub hints: Vec<String>,
    pub hypothesis: Option<String>,
}

impl ExternalSignal {
    /// Render the rule's hypothesis template with captures interpolated.
    /// Unresolved placeholders are left in place.
    pub fn rendered_hypothesis(&self) -> Option<String> {
        self.hypothesis.as_ref().map(|template| {
            let mut text = template.clone();
            for (key, value) in &self.captures {
                text = text.replace(&format!("{{{}}}", key), value);
            }
            text
        })
    }
}

/// The loaded, validated rule set
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<SignalRule>,
}

impl RuleSet {
    /// Load the built-in default rules
    pub fn load_default() -> Result<Self> {
        Self::from_json(DEFAULT_RULES).context("built-in rule set failed validation")
    }

    /// Load rules from a JSON file, replacing the defaults entirely
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read rules file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("invalid rules file {}", path.display()))
    }

    /// Parse and validate a rule file. Fails fast on the first problem.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: RuleFile = serde_json::from_str(text).context("rules file is not valid JSON")?;
        if file.rules.is_empty() {
            bail!("rules file declares no rules");
        }

        let mut rules = Vec::with_capacity(file.rules.len());
        for spec in file.rules {
            if spec.id.is_empty() {
                bail!("rule with empty id");
            }
            if spec.patterns.is_empty() {
                bail!("rule '{}' declares no patterns", spec.id);
            }
            let severity = match spec.severity.as_str() {
                "F" => Severity::Fatal,
                "E" => Severity::Error,
                "W" => Severity::Warning,
                "I" => Severity::Info,
                other => bail!("rule '{}': unknown severity '{}'", spec.id, other),
            };
            let mut patterns = Vec::with_capacity(spec.patterns.len());
            for pattern in &spec.patterns {
                let compiled = Regex::new(&format!("(?i){}", pattern))
                    .with_context(|| format!("rule '{}': invalid pattern '{}'", spec.id, pattern))?;
                patterns.push(compiled);
            }
            rules.push(SignalRule {
                id: spec.id,
                category: spec.category,
                severity,
                patterns,
                hints: spec.hints,
                hypothesis: spec.hypothesis,
            });
        }
        Ok(RuleSet { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against every log line.
    ///
    /// A rule matches a given line at most once (the first matching pattern
    /// wins for that line) but may match multiple distinct lines, producing
    /// one signal per (rule, line).
    pub fn evaluate(&self, text: &str) -> Vec<ExternalSignal> {
        let mut signals = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            for rule in &self.rules {
                for pattern in &rule.patterns {
                    let Some(caps) = pattern.captures(line) else {
                        continue;
                    };
                    let mut captures = BTreeMap::new();
                    for name in pattern.capture_names().flatten() {
                        if let Some(value) = caps.name(name) {
                            captures.insert(name.to_string(), value.as_str().to_string());
                        }
                    }
                    signals.push(ExternalSignal {
                        rule_id: rule.id.clone(),
                        category: rule.category.clone(),
                        severity: rule.severity,
                        captures,
                        line_number: idx + 1,
                        line_text: line.to_string(),
                        hints: rule.hints.clone(),
                        hypothesis: rule.hypothesis.clone(),
                    });
                    break; // first match wins for this (rule, line)
                }
            }
        }

        signals
    }
}
