//! Plan rendering: human text, machine JSON, and a paste-ready prompt
//!
//! JSON keys are a fixed English contract regardless of the human-text
//! language; localization only ever touches headings.

use std::path::Path;

use serde_json::json;

use crate::analysis::{BundleCandidate, Plan};

/// Heading translations for human output. English is the fallback for any
/// unknown language or missing key.
fn heading(key: &str, lang: &str) -> &'static str {
    match (lang, key) {
        ("ru", "parsed_intent") => "РАЗОБРАННОЕ НАМЕРЕНИЕ",
        ("ru", "selected_bundle") => "ВЫБРАННЫЙ ПАКЕТ",
        ("ru", "bundle_candidates") => "КАНДИДАТЫ",
        ("ru", "files_to_open") => "ФАЙЛЫ ДЛЯ ОТКРЫТИЯ",
        ("ru", "other_candidates") => "ОСТАЛЬНЫЕ КАНДИДАТЫ",
        ("ru", "tied_candidates") => "РАВНЫЙ СЧЁТ: ПОБЕДИТЕЛЬ НЕ ВЫБРАН",
        ("ru", "no_matching_jobs") => "(подходящие задания не найдены)",
        ("ru", "no_files") => "(нет файлов)",
        ("ru", "files") => "файлов",
        (_, "parsed_intent") => "PARSED INTENT",
        (_, "selected_bundle") => "SELECTED BUNDLE",
        (_, "bundle_candidates") => "BUNDLE CANDIDATES",
        (_, "files_to_open") => "FILES TO OPEN",
        (_, "other_candidates") => "OTHER CANDIDATES",
        (_, "tied_candidates") => "TIED SCORES: NO SINGLE WINNER",
        (_, "no_matching_jobs") => "(no matching jobs found)",
        (_, "no_files") => "(no files)",
        (_, "files") => "files",
        _ => "",
    }
}

fn candidate_detail(
    lines: &mut Vec<String>,
    rank: usize,
    candidate: &BundleCandidate,
    debug: bool,
    lang: &str,
) {
    lines.push(format!(
        "  #{}  {}  [{}]  score={:.0}",
        rank, candidate.key, candidate.display_name, candidate.score
    ));
    if debug {
        for (rule, points) in &candidate.breakdown {
            lines.push(format!("       +{:.0}  {}", points, rule));
        }
    }
    lines.push(format!("       {}: {}", heading("files", lang), candidate.files.len()));
    for file in &candidate.files {
        lines.push(format!("         {:8}  {}  ({})", file.kind, file.path, file.source));
    }
    lines.push(String::new());
}

/// Render the plan as human-readable text.
///
/// Default mode shows the winner in detail plus a compact summary of the
/// others; `show_all` expands every candidate.
pub fn format_text(plan: &Plan, snapshot: &Path, show_all: bool, debug: bool, lang: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let intent = &plan.intent;

    lines.push(format!("=== {} ===", heading("parsed_intent", lang)));
    lines.push(format!("  CID:           {}", intent.cid.as_deref().unwrap_or("(none)")));
    lines.push(format!("  Job ID:        {}", intent.job_id.as_deref().unwrap_or("(none)")));
    lines.push(format!(
        "  Letter number: {}",
        intent.letter_number.as_deref().unwrap_or("(none)")
    ));
    if !intent.title_keywords.is_empty() {
        lines.push(format!("  Keywords:      {}", intent.title_keywords.join(", ")));
    }
    if let Some(title) = &intent.raw_title {
        lines.push(format!("  Raw title:     {}", title));
    }
    lines.push(String::new());

    if plan.candidates.is_empty() {
        lines.push(format!("=== {} (0) ===", heading("bundle_candidates", lang)));
        lines.push(format!("  {}", heading("no_matching_jobs", lang)));
        lines.push(String::new());
        lines.push(format!("=== {} ===", heading("files_to_open", lang)));
        lines.push(format!("  {}", heading("no_files", lang)));
        return lines.join("\n");
    }

    if show_all {
        lines.push(format!(
            "=== {} ({}) ===",
            heading("bundle_candidates", lang),
            plan.candidates.len()
        ));
        for (idx, candidate) in plan.candidates.iter().enumerate() {
            candidate_detail(&mut lines, idx + 1, candidate, debug, lang);
        }
    } else {
        if plan.tied {
            lines.push(format!("=== {} ===", heading("tied_candidates", lang)));
        } else {
            lines.push(format!("=== {} ===", heading("selected_bundle", lang)));
        }
        candidate_detail(&mut lines, 1, &plan.candidates[0], debug, lang);
    }

    lines.push(format!("=== {} ===", heading("files_to_open", lang)));
    for file in &plan.candidates[0].files {
        lines.push(format!("  {}", snapshot.join(&file.path).display()));
    }

    if !show_all && plan.candidates.len() > 1 {
        lines.push(String::new());
        lines.push(format!(
            "=== {} ({}) ===",
            heading("other_candidates", lang),
            plan.candidates.len() - 1
        ));
        for (idx, candidate) in plan.candidates.iter().enumerate().skip(1) {
            lines.push(format!(
                "  #{}  {}  [{}]  score={:.0}  {}={}",
                idx + 1,
                candidate.key,
                candidate.display_name,
                candidate.score,
                heading("files", lang),
                candidate.files.len()
            ));
        }
    }

    lines.join("\n")
}

/// Build the machine-readable plan value:
/// `{snapshot_root, intent, selected_bundle, other_candidates_summary}`.
/// Keys are always English.
pub fn format_json(plan: &Plan, snapshot: &Path) -> serde_json::Value {
    let intent = &plan.intent;

    let selected = plan.candidates.first().map(|top| {
        json!({
            "rank": 1,
            "key": top.key,
            "display_name": top.display_name,
            "score": top.score as i64,
            "tied": plan.tied,
            "files": top.files.iter().map(|f| {
                json!({
                    "kind": f.kind,
                    "path": f.path,
                    "abs_path": snapshot.join(&f.path).display().to_string(),
                    "reason": f.source,
                })
            }).collect::<Vec<_>>(),
        })
    });

    let others: Vec<_> = plan
        .candidates
        .iter()
        .enumerate()
        .skip(1)
        .map(|(idx, c)| {
            json!({
                "rank": idx + 1,
                "key": c.key,
                "display_name": c.display_name,
                "score": c.score as i64,
                "file_count": c.files.len(),
            })
        })
        .collect();

    json!({
        "snapshot_root": snapshot.display().to_string(),
        "intent": {
            "cid": intent.cid,
            "job_id": intent.job_id,
            "letter_number": intent.letter_number,
            "keywords": intent.title_keywords,
            "raw_title": intent.raw_title,
        },
        "selected_bundle": selected,
        "other_candidates_summary": others,
    })
}

/// Build a paste-ready Markdown prompt embedding the plan JSON
pub fn format_structured_prompt(plan: &Plan, snapshot: &Path) -> String {
    let data = format_json(plan, snapshot);
    let json_block = serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string());

    [
        "# Strata Bundle Plan",
        "",
        "Analysis of a legacy batch-processing bundle. Use ONLY files from the snapshot root below.",
        "",
        "## Instructions",
        "",
        "1. Open the files listed in `selected_bundle.files` (abs_path).",
        "2. Explain where the output is defined and which files are involved.",
        "3. Suggest minimal edits with exact code quotes.",
        "4. Provide a verification checklist.",
        "5. Be concise.",
        "",
        "## Plan data",
        "",
        "```json",
        &json_block,
        "```",
        "",
        &format!("Snapshot root: `{}`", snapshot.display()),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{BundleFile, PlanIntent};

    fn sample_plan() -> Plan {
        Plan {
            intent: PlanIntent {
                cid: Some("wccu".to_string()),
                job_id: Some("dl1".to_string()),
                letter_number: Some("014".to_string()),
                title_keywords: vec!["rate".to_string()],
                raw_title: Some("WCCU Letter 14 rate".to_string()),
            },
            candidates: vec![BundleCandidate {
                key: "wccudl1".to_string(),
                display_name: "WCCU - Letters".to_string(),
                score: 75.0,
                breakdown: vec![("exact_key_match".to_string(), 50.0)],
                files: vec![BundleFile {
                    path: "procs/wccudl1.procs".to_string(),
                    kind: "job",
                    source: "job_file",
                }],
            }],
            tied: false,
        }
    }

    #[test]
    fn test_json_keys_are_english_regardless_of_language() {
        let plan = sample_plan();
        let value = format_json(&plan, Path::new("/snap"));
        assert!(value.get("snapshot_root").is_some());
        assert!(value.get("intent").is_some());
        assert!(value.get("selected_bundle").is_some());
        assert!(value.get("other_candidates_summary").is_some());
    }

    #[test]
    fn test_text_localizes_headings_only() {
        let plan = sample_plan();
        let en = format_text(&plan, Path::new("/snap"), false, false, "en");
        let ru = format_text(&plan, Path::new("/snap"), false, false, "ru");
        assert!(en.contains("SELECTED BUNDLE"));
        assert!(ru.contains("ВЫБРАННЫЙ ПАКЕТ"));
        // The candidate key is data, not a heading
        assert!(en.contains("wccudl1") && ru.contains("wccudl1"));
    }

    #[test]
    fn test_empty_plan_renders_placeholders() {
        let plan = Plan {
            intent: PlanIntent::default(),
            candidates: vec![],
            tied: false,
        };
        let text = format_text(&plan, Path::new("/snap"), false, false, "en");
        assert!(text.contains("(no matching jobs found)"));
    }

    #[test]
    fn test_structured_prompt_embeds_json() {
        let plan = sample_plan();
        let prompt = format_structured_prompt(&plan, Path::new("/snap"));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("selected_bundle"));
    }
}
