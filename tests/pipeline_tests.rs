mod common;

use docx_corrector::docx::comments::parse_comments;
use docx_corrector::docx::manifest::{
    parse_relationships, ContentTypes, COMMENTS_CONTENT_TYPE, COMMENTS_REL_TYPE,
};
use docx_corrector::docx::package::DocxPackage;
use docx_corrector::docx::{extract, verify_integrity};
use docx_corrector::ir::{Category, Suggestion};
use docx_corrector::matching::{find_best_match, DEFAULT_MIN_SCORE};
use docx_corrector::pipeline::{CorrectionRun, PipelineConfig};
use docx_corrector::progress::ConsoleProgress;
use docx_corrector::resolve::NO_MATCH_REASON;
use docx_corrector::suggestions::parse_suggestions;

use common::{standard_entries, write_docx, write_entries, THESIS};

fn config() -> PipelineConfig {
    PipelineConfig {
        backup: false,
        include_confidence: false,
        ..PipelineConfig::default()
    }
}

fn run(cfg: PipelineConfig) -> CorrectionRun {
    CorrectionRun::new(cfg, ConsoleProgress::new(false))
}

#[test]
fn unmatched_suggestion_is_reported_and_others_are_anchored() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "thesis.docx", &THESIS);
    let output = dir.path().join("thesis_corrected.docx");

    let suggestions = vec![
        Suggestion::new(
            "Die Studenten haben ihre Arbeiten abgegeben",
            "Die Studierenden haben ihre Arbeiten abgegeben",
            "Gendergerechte Sprache",
            Category::Style,
            0.9,
        ),
        Suggestion::new(
            "nicht existierender Text",
            "egal",
            "kommt nicht vor",
            Category::Grammar,
            0.7,
        ),
        Suggestion::new(
            "einen deutlichen Zusammenhang zwischen beiden Variablen",
            "einen signifikanten Zusammenhang",
            "Präziser",
            Category::Academic,
            0.8,
        ),
    ];

    let report = run(config())
        .process_document(&input, suggestions, &output)
        .unwrap();

    assert_eq!(report.comments.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].reason, NO_MATCH_REASON);
    assert_eq!(report.failed[0].excerpt, "nicht existierender Text");
    assert_eq!(report.comments[0].paragraph_index, 1);
    assert_eq!(report.comments[1].paragraph_index, 3);
    assert_eq!(report.comments[1].strategy, "exact");
    assert_eq!(report.resolve_stats.attempted, 3);

    assert!(verify_integrity(&output));
    let pkg = DocxPackage::read(&output).unwrap();
    let comments = parse_comments(pkg.data("word/comments.xml").unwrap()).unwrap();
    assert_eq!(comments.len(), 2);
    assert!(comments[0].text.contains("Suggestion: Die Studierenden haben ihre Arbeiten abgegeben"));
    assert!(comments[1].text.contains("Reason: Präziser"));
    assert!(comments.iter().all(|c| c.author == "AI Corrector" && c.initials == "AI"));

    // Re-extracting the output yields the same paragraph text.
    let before = extract(&input).unwrap();
    let after = extract(&output).unwrap();
    assert_eq!(before.full_text, after.full_text);
}

#[test]
fn comment_bodies_survive_xml_escaping() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "a.docx", &["Plain paragraph text for anchoring."]);
    let output = dir.path().join("b.docx");
    let tricky = r#"Comment with "quotes" & <tags> it's"#;

    let report = run(config())
        .process_document(
            &input,
            vec![Suggestion::new(
                "Plain paragraph text for anchoring.",
                tricky,
                tricky,
                Category::Formatting,
                1.0,
            )],
            &output,
        )
        .unwrap();
    assert_eq!(report.success_count(), 1);

    let pkg = DocxPackage::read(&output).unwrap();
    let comments = parse_comments(pkg.data("word/comments.xml").unwrap()).unwrap();
    let lines: Vec<&str> = comments[0].text.lines().collect();
    assert_eq!(lines[1], format!("Suggestion: {tricky}"));
    assert_eq!(lines[2], format!("Reason: {tricky}"));
}

#[test]
fn zero_resolved_suggestions_leave_manifests_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "in.docx", &THESIS);
    let output = dir.path().join("out.docx");

    let report = run(config())
        .process_document(
            &input,
            vec![Suggestion::new("völlig fremder Satz ohne Bezug", "", "", Category::Style, 0.5)],
            &output,
        )
        .unwrap();
    assert_eq!(report.success_count(), 0);
    assert_eq!(report.failed.len(), 1);

    let before = DocxPackage::read(&input).unwrap();
    let after = DocxPackage::read(&output).unwrap();
    assert_eq!(before.data("[Content_Types].xml"), after.data("[Content_Types].xml"));
    assert_eq!(
        before.data("word/_rels/document.xml.rels"),
        after.data("word/_rels/document.xml.rels")
    );
    assert!(!after.contains("word/comments.xml"));
}

#[test]
fn comment_ids_are_unique_and_increasing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "in.docx", &THESIS);
    let output = dir.path().join("out.docx");
    let excerpts = [
        "Einleitung",
        "ihre finalen Arbeiten abgegeben",
        "an drei Standorten",
        "insgesamt 120 Teilnehmenden erprobt",
        "Zusammenhang zwischen beiden Variablen",
    ];
    let suggestions = excerpts
        .iter()
        .enumerate()
        .map(|(i, e)| Suggestion::new(*e, format!("fix {i}"), "r", Category::Clarity, 0.9))
        .collect();

    let report = run(config())
        .process_document(&input, suggestions, &output)
        .unwrap();
    let ids: Vec<u64> = report
        .comments
        .iter()
        .map(|c| c.comment_id.parse().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    let pkg = DocxPackage::read(&output).unwrap();
    let body = String::from_utf8(pkg.data("word/document.xml").unwrap().to_vec()).unwrap();
    for id in &ids {
        assert_eq!(body.matches(&format!(r#"<w:commentRangeStart w:id="{id}"/>"#)).count(), 1);
        assert_eq!(body.matches(&format!(r#"<w:commentRangeEnd w:id="{id}"/>"#)).count(), 1);
        assert_eq!(body.matches(&format!(r#"<w:commentReference w:id="{id}"/>"#)).count(), 1);
    }

    let types = ContentTypes::parse(pkg.data("[Content_Types].xml").unwrap()).unwrap();
    assert_eq!(types.content_type_of("word/comments.xml"), Some(COMMENTS_CONTENT_TYPE));
    let rels = parse_relationships("rels", pkg.data("word/_rels/document.xml.rels").unwrap()).unwrap();
    let comment_rels: Vec<_> = rels.iter().filter(|r| r.rel_type == COMMENTS_REL_TYPE).collect();
    assert_eq!(comment_rels.len(), 1);
    assert_eq!(comment_rels[0].id, "rId4");
}

#[test]
fn missing_document_rels_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let entries: Vec<(&str, String)> = standard_entries(&["Some text to comment on."])
        .into_iter()
        .filter(|(n, _)| *n != "word/_rels/document.xml.rels" && *n != "word/styles.xml")
        .collect();
    let input = write_entries(dir.path(), "norels.docx", &entries);
    let output = dir.path().join("out.docx");

    let report = run(config())
        .process_document(
            &input,
            vec![Suggestion::new("Some text to comment on.", "x", "y", Category::Grammar, 0.9)],
            &output,
        )
        .unwrap();
    assert_eq!(report.success_count(), 1);

    let pkg = DocxPackage::read(&output).unwrap();
    let rels = parse_relationships("rels", pkg.data("word/_rels/document.xml.rels").unwrap()).unwrap();
    assert_eq!(rels.len(), 1);
    assert_eq!(rels[0].id, "rId1");
    assert!(verify_integrity(&output));
}

#[test]
fn suggestions_from_analyzer_output_and_report_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "paper.docx", &THESIS);
    let output = dir.path().join("paper_corrected.docx");
    let report_path = dir.path().join("report.json");
    let raw = r#"Analysis complete.
```json
{"suggestions": [
  {"original_text": "Die Methode wurde an drei Standorten", "suggested": "Die Methode wurde an drei Standorten erfolgreich", "explanation": "Ergänzung", "category": "methodology", "confidence": 0.66}
]}
```"#;
    let suggestions = parse_suggestions(raw).unwrap();

    let cfg = PipelineConfig {
        report_json: true,
        report_json_path: Some(report_path.clone()),
        include_confidence: true,
        ..config()
    };
    let report = run(cfg).process_document(&input, suggestions, &output).unwrap();
    assert_eq!(report.success_count(), 1);

    let v: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path).unwrap()).unwrap();
    assert_eq!(v["comments"][0]["comment_id"], "0");
    assert_eq!(v["comments"][0]["category"], "methodology");
    assert_eq!(v["resolve_stats"]["succeeded"], 1);

    let pkg = DocxPackage::read(&output).unwrap();
    let comments = parse_comments(pkg.data("word/comments.xml").unwrap()).unwrap();
    assert!(comments[0].text.ends_with("Confidence: 66%"));
}

#[test]
fn backup_is_created_before_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_docx(dir.path(), "orig.docx", &THESIS);
    let output = dir.path().join("orig_corrected.docx");
    let cfg = PipelineConfig {
        backup: true,
        ..config()
    };
    let report = run(cfg)
        .process_document(
            &input,
            vec![Suggestion::new("Einleitung", "Introduction", "", Category::Structure, 0.9)],
            &output,
        )
        .unwrap();
    let backup = report.backup.unwrap();
    assert_eq!(std::fs::read(&backup).unwrap(), std::fs::read(&input).unwrap());
}

#[test]
fn scenario_matches_through_public_api() {
    let haystack = [
        "Einleitung",
        "Die Studenten haben gestern ihre finalen Arbeiten abgegeben und warten...",
    ];
    let m = find_best_match(
        "Die Studenten haben ihre Arbeiten abgegeben",
        &haystack,
        DEFAULT_MIN_SCORE,
    )
    .unwrap();
    assert_eq!(m.paragraph_index, 1);
    assert!(m.match_score >= 75.0);
    assert!(find_best_match("nicht existierender Text", &haystack, DEFAULT_MIN_SCORE).is_none());
}
