//! Log analyzer: raw failure log text -> structured facts
//!
//! This stage is graph-agnostic by contract: it extracts identifier tokens,
//! script paths, message codes, and document-definition tokens without any
//! store lookups, so it is independently testable and trivially pure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::patterns;

/// Message severity, parsed once from a code's trailing letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Parse from the single-letter encoding used by the legacy codes
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'I' => Some(Severity::Info),
            'W' => Some(Severity::Warning),
            'E' => Some(Severity::Error),
            'F' => Some(Severity::Fatal),
            _ => None,
        }
    }

    /// Severity of a full message code (trailing letter)
    pub fn from_code(code: &str) -> Option<Self> {
        code.chars().last().and_then(Self::from_letter)
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }

    pub fn letter(self) -> char {
        match self {
            Severity::Info => 'I',
            Severity::Warning => 'W',
            Severity::Error => 'E',
            Severity::Fatal => 'F',
        }
    }
}

/// One meaningful log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLineSignal {
    pub line_number: usize,
    pub message: String,
    pub timestamp: Option<String>,
    pub code: Option<String>,
    pub severity: Severity,
}

/// Parsed facts from one log file (transient, folded into the incident)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogAnalysis {
    pub path: String,
    pub total_lines: usize,
    /// Lines carrying Error or Fatal severity, in log order
    pub error_lines: Vec<LogLineSignal>,
    /// Sorted, deduplicated extraction sets
    pub prefix_tokens: Vec<String>,
    pub jid_tokens: Vec<String>,
    pub script_paths: Vec<String>,
    pub error_codes: Vec<String>,
    pub docdef_tokens: Vec<String>,
    pub io_paths: Vec<String>,
    /// The launcher wrapper complained about a non-zero exit somewhere
    pub has_wrapper_noise: bool,
    /// At least one strong failure indicator was seen
    pub has_strong_failure: bool,
}

impl LogAnalysis {
    /// First Error/Fatal line carrying the given code, if any
    pub fn first_line_with_code(&self, code: &str) -> Option<&LogLineSignal> {
        self.error_lines
            .iter()
            .find(|l| l.code.as_deref() == Some(code))
    }
}

/// Parse one log line into a signal, or None for noise lines
fn parse_log_line(line: &str, line_number: usize) -> Option<LogLineSignal> {
    let line = line.trim();
    if line.is_empty() || line.contains("is still alive") || line.contains("is no longer alive") {
        return None;
    }

    let timestamp = patterns::LOG_TIMESTAMP
        .captures(line)
        .map(|caps| caps[1].to_string());

    let mut code = None;
    let mut severity = Severity::Info;

    if let Some(caps) = patterns::MESSAGE_CODE.captures(line) {
        let matched = caps[1].to_string();
        severity = Severity::from_code(&matched).unwrap_or(Severity::Info);
        code = Some(matched);
    }
    if let Some(caps) = patterns::ORA_CODE.captures(line) {
        code = Some(caps[1].to_string());
        severity = Severity::Error;
    }

    // Error keywords upgrade Info/Warning lines, never downgrade Fatal
    if severity < Severity::Error && patterns::LOG_ERROR_KEYWORDS.is_match(line) {
        severity = Severity::Error;
    }

    Some(LogLineSignal {
        line_number,
        message: line.to_string(),
        timestamp,
        code,
        severity,
    })
}

/// Analyze raw log text. Pure function of the text and display path.
pub fn analyze_log(text: &str, path: &str) -> LogAnalysis {
    let mut analysis = LogAnalysis {
        path: path.to_string(),
        ..LogAnalysis::default()
    };

    let mut prefix_tokens = BTreeSet::new();
    let mut jid_tokens = BTreeSet::new();
    let mut script_paths = BTreeSet::new();
    let mut error_codes = BTreeSet::new();
    let mut docdef_tokens = BTreeSet::new();
    let mut io_paths = BTreeSet::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_number = idx + 1;
        analysis.total_lines = line_number;

        let Some(signal) = parse_log_line(raw_line, line_number) else {
            continue;
        };

        if let Some(code) = &signal.code {
            error_codes.insert(code.clone());
        }

        for caps in patterns::LOG_PREFIX_TOKEN.captures_iter(raw_line) {
            prefix_tokens.insert(caps[1].to_ascii_lowercase());
        }
        for caps in patterns::LOG_JID_TOKEN.captures_iter(raw_line) {
            jid_tokens.insert(caps[1].to_ascii_lowercase());
        }
        for caps in patterns::LOG_SCRIPT_PATH.captures_iter(raw_line) {
            script_paths.insert(caps[1].to_string());
        }
        for caps in patterns::LOG_DOCDEF_REF.captures_iter(raw_line) {
            docdef_tokens.insert(caps[1].to_ascii_uppercase());
        }
        for caps in patterns::LOG_DOCDEF_PARAM.captures_iter(raw_line) {
            docdef_tokens.insert(caps[1].to_ascii_uppercase());
        }
        for caps in patterns::DOCDEF_TOKEN.captures_iter(raw_line) {
            docdef_tokens.insert(caps[1].to_ascii_uppercase());
        }
        for caps in patterns::LOG_IO_PATH.captures_iter(raw_line) {
            io_paths.insert(caps[1].to_string());
        }

        if patterns::WRAPPER_NOISE.is_match(raw_line) {
            analysis.has_wrapper_noise = true;
        }
        if !analysis.has_strong_failure
            && patterns::STRONG_FAILURE.iter().any(|p| p.is_match(raw_line))
        {
            analysis.has_strong_failure = true;
        }

        if signal.severity >= Severity::Error {
            analysis.error_lines.push(signal);
        }
    }

    analysis.prefix_tokens = prefix_tokens.into_iter().collect();
    analysis.jid_tokens = jid_tokens.into_iter().collect();
    analysis.script_paths = script_paths.into_iter().collect();
    analysis.error_codes = error_codes.into_iter().collect();
    analysis.docdef_tokens = docdef_tokens.into_iter().collect();
    analysis.io_paths = io_paths.into_iter().collect();

    analysis
}
