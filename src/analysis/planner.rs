//! Bundle planner
//!
//! Resolves a free-form intent (customer id, job id, and/or title fragment)
//! to ranked candidate jobs and assembles each candidate's related-file
//! bundle: the defining artifact, RUNS/READS targets, job-family matched
//! control files, and document definitions gathered from two independent
//! sources (control `format_dfa` fields and tokens in the job declaration).

use std::collections::BTreeSet;

use anyhow::Result;

use crate::parse::patterns;
use crate::store::{NodeType, Store};

/// Stopwords excluded from title keywords
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "has", "have", "had",
    "not", "but", "its", "our", "all", "new", "update", "letter", "monthly", "daily", "weekly",
    "run", "job",
];

/// Parsed plan intent
#[derive(Debug, Clone, Default)]
pub struct PlanIntent {
    pub cid: Option<String>,
    pub job_id: Option<String>,
    /// Zero-padded to 3 digits ("014")
    pub letter_number: Option<String>,
    pub title_keywords: Vec<String>,
    pub raw_title: Option<String>,
}

/// One file in a candidate's bundle
#[derive(Debug, Clone, PartialEq)]
pub struct BundleFile {
    pub path: String,
    pub kind: &'static str,
    pub source: &'static str,
}

/// One ranked candidate job with its assembled bundle
#[derive(Debug, Clone)]
pub struct BundleCandidate {
    pub key: String,
    pub display_name: String,
    pub score: f64,
    pub breakdown: Vec<(String, f64)>,
    pub files: Vec<BundleFile>,
}

/// Full plan result
#[derive(Debug)]
pub struct Plan {
    pub intent: PlanIntent,
    /// Ranked candidates, best first
    pub candidates: Vec<BundleCandidate>,
    /// True when the top two candidates scored identically; no single
    /// winner is marked in that case
    pub tied: bool,
}

/// Parse a free-form title into (cid, letter_number, keywords)
pub fn parse_title(title: &str) -> (Option<String>, Option<String>, Vec<String>) {
    let cid = patterns::TITLE_CID
        .captures(title)
        .map(|caps| caps[1].to_ascii_lowercase());

    let letter_number = patterns::TITLE_LETTER
        .captures(title)
        .map(|caps| format!("{:0>3}", &caps[1]));

    let keywords: Vec<String> = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_ascii_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect();

    (cid, letter_number, keywords)
}

/// Build an intent, explicit args always winning over title-parsed values
pub fn build_intent(cid: Option<&str>, job_id: Option<&str>, title: Option<&str>) -> PlanIntent {
    let (title_cid, title_letter, title_keywords) = match title {
        Some(t) => parse_title(t),
        None => (None, None, Vec::new()),
    };

    PlanIntent {
        cid: cid.map(str::to_ascii_lowercase).or(title_cid),
        job_id: job_id.map(str::to_ascii_lowercase),
        letter_number: title_letter,
        title_keywords,
        raw_title: title.map(str::to_string),
    }
}

/// Derive the job-family prefix: the identifier with its trailing
/// single-character variant stripped. Jobs `wccudla` and `wccudl1` share the
/// family `wccudl`; a bare 4-char customer id is its own family.
pub fn job_family_prefix(name: &str) -> &str {
    if name.len() > 4 {
        &name[..name.len() - 1]
    } else {
        name
    }
}

/// Does a document-definition identifier's trailing numeric suffix equal the
/// intended letter number (zero-padded to the identifier's digit width)?
fn letter_matches(code: &str, letter_number: &str) -> bool {
    let digits: String = code
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        return false;
    }
    match (digits.parse::<u32>(), letter_number.parse::<u32>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Apply the letter-number filter: with a letter set, only identifiers whose
/// trailing numeric suffix equals it survive
pub fn filter_docdefs_by_letter(codes: Vec<String>, letter_number: Option<&str>) -> Vec<String> {
    match letter_number {
        Some(letter) => codes
            .into_iter()
            .filter(|code| letter_matches(code, letter))
            .collect(),
        None => codes,
    }
}

/// Extract unique DFA codes from control file content (`format_dfa="X"` and
/// every `*_format_dfa` variant)
fn dfa_codes_from_control(content: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut codes = Vec::new();
    for caps in patterns::FORMAT_DFA.captures_iter(content) {
        let code = caps[1].to_ascii_uppercase();
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    codes
}

/// Extract DFA-like tokens with the customer-id prefix from a job's parsed
/// declaration JSON
fn dfa_tokens_from_parsed(parsed_json: &str, cid: &str) -> Vec<String> {
    let prefix = cid.to_ascii_uppercase();
    let mut seen = BTreeSet::new();
    let mut codes = Vec::new();
    for caps in patterns::DFA_TOKEN.captures_iter(parsed_json) {
        let token = caps[1].to_string();
        if token.starts_with(&prefix) && seen.insert(token.clone()) {
            codes.push(token);
        }
    }
    codes
}

/// Strip the customer id and "Letter N" phrase from a raw title, leaving the
/// distinctive phrase used for the +30 title match
fn extract_title_phrase(raw_title: &str) -> String {
    let without_cid = patterns::TITLE_CID.replace(raw_title, "");
    let without_letter = patterns::TITLE_LETTER.replace(&without_cid, "");
    without_letter
        .trim_matches(|c: char| c.is_whitespace() || "-–—:,".contains(c))
        .to_string()
}

/// Find candidate job nodes for an intent
fn find_candidates(store: &Store, intent: &PlanIntent) -> Result<Vec<BundleCandidate>> {
    let mut candidates: Vec<BundleCandidate> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    let mut push = |node_key: String, display: String, candidates: &mut Vec<BundleCandidate>| {
        if seen.insert(node_key.clone()) {
            candidates.push(BundleCandidate {
                key: node_key,
                display_name: display,
                score: 0.0,
                breakdown: Vec::new(),
                files: Vec::new(),
            });
        }
    };

    if let (Some(cid), Some(job_id)) = (&intent.cid, &intent.job_id) {
        let exact_key = format!("{cid}{job_id}");
        if let Some(node) = store.node_by_key(NodeType::Job, &exact_key)? {
            push(node.key, node.display_name, &mut candidates);
        }
        for node in store.nodes_by_key_prefix(NodeType::Job, cid)? {
            push(node.key, node.display_name, &mut candidates);
        }
    } else if let Some(cid) = &intent.cid {
        for node in store.nodes_by_key_prefix(NodeType::Job, cid)? {
            push(node.key, node.display_name, &mut candidates);
        }
    }

    if candidates.is_empty() && !intent.title_keywords.is_empty() {
        // Keyword fallback against the parsed declarations
        for (name, parsed_json) in store.jobs_parsed()? {
            let haystack = parsed_json.to_ascii_lowercase();
            if intent.title_keywords.iter().any(|kw| haystack.contains(kw)) {
                if let Some(node) = store.node_by_key(NodeType::Job, &name)? {
                    push(node.key, node.display_name, &mut candidates);
                }
            }
        }
    }

    Ok(candidates)
}

/// Populate a candidate's bundle
fn build_bundle(store: &Store, candidate: &mut BundleCandidate, intent: &PlanIntent) -> Result<()> {
    let mut seen_paths: BTreeSet<String> = BTreeSet::new();
    let mut add = |path: String, kind: &'static str, source: &'static str,
                   files: &mut Vec<BundleFile>| {
        if seen_paths.insert(path.clone()) {
            files.push(BundleFile { path, kind, source });
        }
    };

    let Some(node) = store.node_by_key(NodeType::Job, &candidate.key)? else {
        return Ok(());
    };

    // 1. The defining job artifact
    if let Some(canonical) = &node.canonical_path {
        add(canonical.clone(), "job", "job_file", &mut candidate.files);
    }

    // 2./3. RUNS targets (scripts) and READS targets (inserts)
    for edge in store.edges_from(node.id)? {
        let Some(canonical) = edge.node.canonical_path.clone() else {
            continue;
        };
        match edge.rel_type.as_str() {
            "RUNS" => add(canonical, "script", "RUNS_edge", &mut candidate.files),
            "READS" => add(canonical, "insert", "READS_edge", &mut candidate.files),
            _ => {}
        }
    }

    // 4. Control files by job-family prefix, never by bare customer id
    let cid = intent
        .cid
        .clone()
        .unwrap_or_else(|| candidate.key.chars().take(4).collect());
    let family = job_family_prefix(&candidate.key).to_string();
    let all_controls = store.artifacts_by_kind_path_like("control", &cid)?;
    let mut family_controls: Vec<_> = all_controls
        .into_iter()
        .filter(|row| row.path.to_ascii_lowercase().contains(&family))
        .collect();
    // Within the family, prefer controls naming the intended letter
    if let Some(letter) = &intent.letter_number {
        let letter_controls: Vec<_> = family_controls
            .iter()
            .filter(|row| row.path.contains(letter.as_str()))
            .cloned()
            .collect();
        if !letter_controls.is_empty() {
            family_controls = letter_controls;
        }
    }

    // 5. Document definitions from two independent sources, unioned
    let mut dfa_codes: Vec<(String, &'static str)> = Vec::new();

    for control in &family_controls {
        add(control.path.clone(), "control", "control_match", &mut candidate.files);
        let codes = dfa_codes_from_control(control.text_content.as_deref().unwrap_or(""));
        for code in filter_docdefs_by_letter(codes, intent.letter_number.as_deref()) {
            dfa_codes.push((code, "control_format_dfa"));
        }
    }

    if let Some(parsed_json) = store.job_parsed(&candidate.key)? {
        let codes = dfa_tokens_from_parsed(&parsed_json, &cid);
        for code in filter_docdefs_by_letter(codes, intent.letter_number.as_deref()) {
            dfa_codes.push((code, "job_docdef_token"));
        }
    }

    for (code, source) in dfa_codes {
        for row in store.artifacts_by_kind_path_like("docdef", &code)? {
            add(row.path, "docdef", source, &mut candidate.files);
        }
    }

    Ok(())
}

/// Score a candidate against the intent
fn score_candidate(store: &Store, candidate: &mut BundleCandidate, intent: &PlanIntent) -> Result<()> {
    let mut breakdown: Vec<(String, f64)> = Vec::new();

    if let (Some(cid), Some(job_id)) = (&intent.cid, &intent.job_id) {
        if candidate.key == format!("{cid}{job_id}") {
            breakdown.push(("exact_key_match".to_string(), 50.0));
        }
    }

    if let Some(cid) = &intent.cid {
        if candidate.key.starts_with(cid.as_str()) {
            breakdown.push(("cid_prefix".to_string(), 15.0));
        }
    }

    if candidate.files.iter().any(|f| f.kind == "script") {
        breakdown.push(("has_scripts".to_string(), 10.0));
    }
    if candidate.files.iter().any(|f| f.kind == "insert") {
        breakdown.push(("has_inserts".to_string(), 10.0));
    }
    if candidate.files.iter().any(|f| f.kind == "docdef") {
        breakdown.push(("has_docdef".to_string(), 5.0));
    }

    let parsed = store
        .job_parsed(&candidate.key)?
        .unwrap_or_default()
        .to_ascii_lowercase();

    if let Some(raw_title) = &intent.raw_title {
        if !parsed.is_empty() {
            let phrase = extract_title_phrase(raw_title);
            if !phrase.is_empty() && parsed.contains(&phrase.to_ascii_lowercase()) {
                breakdown.push(("title_phrase_match".to_string(), 30.0));
            }
        }
    }

    for keyword in &intent.title_keywords {
        if parsed.contains(keyword.as_str()) {
            breakdown.push((format!("keyword:{keyword}"), 2.0));
        }
    }

    candidate.score = breakdown.iter().map(|(_, points)| points).sum();
    candidate.breakdown = breakdown;
    Ok(())
}

/// Generate a plan: build the intent, find candidates, bundle and score them
pub fn generate_plan(
    store: &Store,
    cid: Option<&str>,
    job_id: Option<&str>,
    title: Option<&str>,
    limit: usize,
) -> Result<Plan> {
    let intent = build_intent(cid, job_id, title);
    let mut candidates = find_candidates(store, &intent)?;

    for candidate in &mut candidates {
        build_bundle(store, candidate, &intent)?;
        score_candidate(store, candidate, &intent)?;
    }

    // Score desc, key asc for deterministic ordering
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.key.cmp(&b.key))
    });
    candidates.truncate(limit.max(1));

    let tied = candidates.len() >= 2 && candidates[0].score == candidates[1].score;

    Ok(Plan {
        intent,
        candidates,
        tied,
    })
}
