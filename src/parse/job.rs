//! Parser for job definition (.procs) artifacts
//!
//! A job definition is a loosely formatted text file: header metadata,
//! `__`-prefixed processing fields, and free-form references to scripts,
//! control files, and document definitions. The parser is regex-driven and
//! never fails on malformed input; it extracts what it can.

use serde::{Deserialize, Serialize};

use super::patterns;

/// Structured data extracted from one job definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDecl {
    // Header metadata
    pub firm: String,
    pub cid: String,
    pub app_type: String,
    pub job_id: Option<String>,

    // Processing fields, each with the 1-indexed declaring line
    pub shell_script: Option<String>,
    pub shell_script_line: Option<usize>,
    pub log_file: Option<String>,
    pub file_setup: Option<String>,
    pub file_setup_line: Option<usize>,

    // File references
    pub print_files: Vec<String>,
    pub input_location: Option<String>,

    // Cross-references to other job definitions
    pub cross_refs: Vec<String>,

    // Document-definition tokens embedded anywhere in the declaration
    pub docdef_tokens: Vec<String>,

    // All absolute paths seen in the file
    pub all_paths: Vec<String>,
}

impl JobDecl {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Scripts this job declares, beyond the primary shell script.
    /// The primary script is a RUNS relation; the rest are CALLS.
    pub fn auxiliary_scripts(&self) -> Vec<&str> {
        self.all_paths
            .iter()
            .filter(|p| {
                (p.ends_with(".sh") || p.ends_with(".pl") || p.ends_with(".py"))
                    && Some(p.as_str()) != self.shell_script.as_deref()
            })
            .map(String::as_str)
            .collect()
    }

    /// Control/insert resources this job reads
    pub fn read_resources(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(setup) = self.file_setup.as_deref() {
            out.push(setup);
        }
        if let Some(input) = self.input_location.as_deref() {
            if Some(input) != self.file_setup.as_deref() {
                out.push(input);
            }
        }
        for path in &self.all_paths {
            if (path.ends_with(".control") || path.ends_with(".ins"))
                && !out.contains(&path.as_str())
            {
                out.push(path);
            }
        }
        out
    }

    /// Document-definition files referenced by path
    pub fn docdef_paths(&self) -> Vec<&str> {
        self.all_paths
            .iter()
            .filter(|p| p.to_ascii_lowercase().ends_with(".dfa"))
            .map(String::as_str)
            .collect()
    }
}

/// Parse a job definition from its text content. Pure, never fails.
pub fn parse_job(text: &str) -> JobDecl {
    let mut decl = JobDecl {
        firm: "unknown".to_string(),
        cid: "unknown".to_string(),
        app_type: "unknown".to_string(),
        ..JobDecl::default()
    };

    if let Some(caps) = patterns::JOB_FIRM.captures(text) {
        decl.firm = caps[1].trim().to_string();
    }
    if let Some(caps) = patterns::JOB_CID.captures(text) {
        decl.cid = caps[1].trim().to_ascii_lowercase();
    }
    if let Some(caps) = patterns::JOB_APP_TYPE.captures(text) {
        decl.app_type = caps[1].trim().to_string();
    }
    if let Some(caps) = patterns::JOB_ID.captures(text) {
        decl.job_id = Some(caps[1].trim().to_string());
    }

    if let Some(caps) = patterns::JOB_SHELL_SCRIPT.captures(text) {
        decl.shell_script = Some(caps[1].trim().to_string());
        decl.shell_script_line = caps
            .get(1)
            .map(|m| patterns::line_number_at(text, m.start()));
    }
    if let Some(caps) = patterns::JOB_LOG_FILE.captures(text) {
        decl.log_file = Some(caps[1].trim().to_string());
    }
    if let Some(caps) = patterns::JOB_FILE_SETUP.captures(text) {
        decl.file_setup = Some(caps[1].trim().to_string());
        decl.file_setup_line = caps
            .get(1)
            .map(|m| patterns::line_number_at(text, m.start()));
    }

    for caps in patterns::JOB_PRINT_FILES.captures_iter(text) {
        let path = caps[1].trim().to_string();
        if !decl.print_files.contains(&path) {
            decl.print_files.push(path);
        }
    }
    if let Some(caps) = patterns::JOB_INPUT_LOCATION.captures(text) {
        decl.input_location = Some(caps[1].trim().to_string());
    }

    for caps in patterns::JOB_CROSSREF.captures_iter(text) {
        let reference = caps[1].trim().to_string();
        if !decl.cross_refs.contains(&reference) {
            decl.cross_refs.push(reference);
        }
    }

    for caps in patterns::DOCDEF_TOKEN.captures_iter(text) {
        let token = caps[1].to_ascii_uppercase();
        if !decl.docdef_tokens.contains(&token) {
            decl.docdef_tokens.push(token);
        }
    }

    for caps in patterns::ABSOLUTE_PATH.captures_iter(text) {
        let path = caps[1].trim_end_matches(['.', ',', ';', ':', ')', ']', '}']).to_string();
        if path.len() > 5 && !decl.all_paths.contains(&path) {
            decl.all_paths.push(path);
        }
    }

    decl
}
