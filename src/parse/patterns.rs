//! Compiled regex tables for the structural and log parsers
//!
//! Patterns are compiled once into module-level statics. The shapes come
//! from the legacy batch environment: job definition headers, `__`-prefixed
//! processing fields, message codes with a trailing severity letter, and
//! document-definition tokens (4-letter customer id + 2-letter type + digits).

use once_cell::sync::Lazy;
use regex::Regex;

// ---------------------------------------------------------------------------
// Job definition (.procs) patterns
// ---------------------------------------------------------------------------

pub static JOB_FIRM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Firm:\s*(.+?)(?:\s{2,}|$)").unwrap());
pub static JOB_CID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^CID\s*:\s*(\w+)").unwrap());
pub static JOB_APP_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(?:Application Type|Production Type):\s*(.+?)(?:\s{2,}|$)").unwrap());
pub static JOB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)Job ID:\s*(\S+)").unwrap());

pub static JOB_SHELL_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)__(?:Processing\s+)?Shell Script:\s*(/\S+)").unwrap());
pub static JOB_LOG_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)__Log File:\s*(/\S+)").unwrap());
pub static JOB_FILE_SETUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)__File Setup Before Processing:\s*(/\S+)").unwrap());
pub static JOB_PRINT_FILES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)Print files?:\s*(/\S+)").unwrap());
pub static JOB_INPUT_LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)File Location:\s*(/\S+)").unwrap());
pub static JOB_CROSSREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)refer to\s+(/home/procs/\w+\.procs)").unwrap());

/// Absolute paths in the legacy filesystem layout
pub static ABSOLUTE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(/(?:home|d|z|download|ftpbu)/[^\s,;"'<>()]+)"#).unwrap());

// ---------------------------------------------------------------------------
// Log patterns
// ---------------------------------------------------------------------------

/// Timestamp shape: 2026-01-23/09:20:43.527
pub static LOG_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2}/\d{2}:\d{2}:\d{2}\.\d{3})").unwrap());

/// Legacy message code: uppercase prefix, 4-digit body, trailing severity letter
pub static MESSAGE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{4}\d{4}[IWEF])\b").unwrap());

/// Database error codes (no trailing severity letter, always treated as Error)
pub static ORA_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(ORA-\d{5})").unwrap());

/// Explicit document-definition reference: DOCDEF 'ACBKDS11'
pub static LOG_DOCDEF_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"DOCDEF '(\w+)'").unwrap());

/// docdef= parameter
pub static LOG_DOCDEF_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)docdef=(\w+)").unwrap());

/// Document-definition token: 4-letter customer id + 2-letter type + 2 digits
pub static DOCDEF_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{4}[A-Z]{2}\d{2})\b").unwrap());

/// Error keywords that upgrade a line's severity
pub static LOG_ERROR_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ERROR|FAIL|failed|exception|mismatch|missing|abort|aborted)\b").unwrap()
});

/// $PREFIX=acbkds1 tokens, the strongest job-identity signal in a log
pub static LOG_PREFIX_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$PREFIX=(\w+)").unwrap());

/// $JID=ds1 tokens
pub static LOG_JID_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$JID=(\w+)").unwrap());

/// Script paths mentioned in logs
pub static LOG_SCRIPT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(/home/(?:master|insert|util)/[\w\-\.]+\.(?:sh|pl|py|ins))").unwrap()
});

/// input=/d/..., output=/d/..., profile=... parameters
pub static LOG_IO_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:input|output|profile)=([^\s]+)").unwrap());

/// Launcher wrapper complaint that never identifies a root cause
pub static WRAPPER_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ERROR:\s*Generator returns a non-zero value").unwrap());

/// Strong failure indicators, used to distinguish real failures from wrapper noise
pub static STRONG_FAILURE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)aborted").unwrap(),
        Regex::new(r"(?i)not generated").unwrap(),
        Regex::new(r"ORA-\d{5}").unwrap(),
        Regex::new(r"(?i)missing\s+(?:input|file|docdef)").unwrap(),
        Regex::new(r"(?i)Permission denied").unwrap(),
        Regex::new(r"(?i)No such file").unwrap(),
        Regex::new(r"(?i)cannot open").unwrap(),
        Regex::new(r"(?i)failed to open").unwrap(),
        // Any Fatal-severity code
        Regex::new(r"[A-Z]{4}\d{4}F\b").unwrap(),
    ]
});

// ---------------------------------------------------------------------------
// Planner patterns
// ---------------------------------------------------------------------------

/// format_dfa="WCCUDL014" and all *_format_dfa variants in control files
pub static FORMAT_DFA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\w*format_dfa\s*[=:]\s*["']?(\w+)["']?"#).unwrap());

/// DFA-like token: uppercase customer-id prefix followed by letters/digits
pub static DFA_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{4}[A-Z0-9]{2,})\b").unwrap());

/// First 4-uppercase-letter token in a plan title (the customer id)
pub static TITLE_CID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{4})\b").unwrap());

/// "Letter 14" or "DL014" phrases in plan titles
pub static TITLE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:Letter\s*|DL)(\d{2,3})\b").unwrap());

/// Find the 1-indexed line number for a byte offset into a text
pub fn line_number_at(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())].matches('\n').count() + 1
}
