//! Heuristic source analysis tools used by the code review workflow.
//!
//! These are deliberately simple text scans; they do not parse the code.

use serde::{Deserialize, Serialize};

use waypoint_core::error::{Result, WaypointError};
use waypoint_core::traits::Tool;

const CONTROL_KEYWORDS: [&str; 5] = [" if ", " for ", " while ", " elif ", " case "];
const LONG_FILE_CHARS: usize = 2000;

/// Input shared by the tools that scan a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeInput {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionList {
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub lines: usize,
    pub control_flow_count: usize,
    /// Normalized to `[0, 1]`.
    pub complexity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReport {
    pub issues: Vec<String>,
    pub issue_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSummary {
    #[serde(default)]
    pub complexity_score: f64,
    #[serde(default)]
    pub issue_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
    /// In `[0, 1]`; higher is better.
    pub quality_score: f64,
}

fn parse<T: serde::de::DeserializeOwned>(input: serde_json::Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| WaypointError::ToolValidation(e.to_string()))
}

/// Names of `def` functions, in source order.
pub fn extract_functions(code: &str) -> FunctionList {
    let functions = code
        .lines()
        .filter_map(|line| line.trim().strip_prefix("def "))
        .map(|rest| rest.split('(').next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    FunctionList { functions }
}

/// Combine line count and control-flow keyword count into a score.
pub fn check_complexity(code: &str) -> ComplexityReport {
    let lines = code.lines().count();
    let control_flow_count: usize = CONTROL_KEYWORDS
        .iter()
        .map(|kw| code.matches(kw).count())
        .sum();
    let complexity_score =
        (lines as f64 / 100.0 + control_flow_count as f64 / 50.0).min(1.0);

    ComplexityReport {
        lines,
        control_flow_count,
        complexity_score,
    }
}

/// Rule-based issue detection.
pub fn detect_issues(code: &str) -> IssueReport {
    let mut issues = Vec::new();

    if code.contains("TODO") {
        issues.push("Found TODO comments in the code.".to_string());
    }
    if code.contains("print(") {
        issues.push("Debug 'print' statements present.".to_string());
    }
    if code.chars().count() > LONG_FILE_CHARS {
        issues.push("File is quite long; consider splitting it.".to_string());
    }
    if code.contains("import *") {
        issues.push("Wildcard imports detected; prefer explicit imports.".to_string());
    }

    let issue_count = issues.len();
    IssueReport {
        issues,
        issue_count,
    }
}

/// Turn a complexity score and issue count into suggestions and a quality score.
pub fn suggest_improvements(summary: &ReviewSummary) -> Suggestions {
    let mut suggestions = Vec::new();

    if summary.complexity_score > 0.7 {
        suggestions.push("Refactor large or complex functions into smaller units.".to_string());
    }
    if summary.issue_count > 0 {
        suggestions.push("Address the detected issues before merging.".to_string());
    }
    if summary.complexity_score <= 0.3 && summary.issue_count == 0 {
        suggestions.push("Code looks clean and simple. Good job!".to_string());
    }

    let quality_score =
        (1.0 - 0.5 * summary.complexity_score - 0.1 * summary.issue_count as f64).max(0.0);

    Suggestions {
        suggestions,
        quality_score,
    }
}

// ── ExtractFunctionsTool ────────────────────────────────────────

pub struct ExtractFunctionsTool;

impl Tool for ExtractFunctionsTool {
    fn name(&self) -> &str {
        "extract_functions"
    }
    fn description(&self) -> &str {
        "List functions defined with `def` in a source file."
    }
    fn call(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        let input: CodeInput = parse(input)?;
        Ok(serde_json::to_value(extract_functions(&input.code))?)
    }
}

// ── CheckComplexityTool ─────────────────────────────────────────

pub struct CheckComplexityTool;

impl Tool for CheckComplexityTool {
    fn name(&self) -> &str {
        "check_complexity"
    }
    fn description(&self) -> &str {
        "Score source complexity from line count and control-flow keywords."
    }
    fn call(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        let input: CodeInput = parse(input)?;
        Ok(serde_json::to_value(check_complexity(&input.code))?)
    }
}

// ── DetectIssuesTool ────────────────────────────────────────────

pub struct DetectIssuesTool;

impl Tool for DetectIssuesTool {
    fn name(&self) -> &str {
        "detect_issues"
    }
    fn description(&self) -> &str {
        "Flag TODOs, debug prints, wildcard imports, and very long files."
    }
    fn call(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        let input: CodeInput = parse(input)?;
        Ok(serde_json::to_value(detect_issues(&input.code))?)
    }
}

// ── SuggestImprovementsTool ─────────────────────────────────────

pub struct SuggestImprovementsTool;

impl Tool for SuggestImprovementsTool {
    fn name(&self) -> &str {
        "suggest_improvements"
    }
    fn description(&self) -> &str {
        "Suggest improvements and compute a quality score from a review summary."
    }
    fn call(&self, input: serde_json::Value) -> Result<serde_json::Value> {
        let summary: ReviewSummary = parse(input)?;
        Ok(serde_json::to_value(suggest_improvements(&summary))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "import os\n\ndef main(args):\n    if args:\n        print(args)\n\n    def  helper ():\n        pass\n# TODO: tidy\n";

    #[test]
    fn test_extract_functions() {
        let result = extract_functions(SAMPLE);
        assert_eq!(result.functions, vec!["main", "helper"]);
    }

    #[test]
    fn test_extract_skips_nameless_def() {
        let result = extract_functions("def (x):\n  pass\nundef foo():\n");
        assert!(result.functions.is_empty());
    }

    #[test]
    fn test_check_complexity() {
        let report = check_complexity(SAMPLE);
        assert_eq!(report.lines, 9);
        assert_eq!(report.control_flow_count, 1);
        assert!((report.complexity_score - (0.09 + 0.02)).abs() < 1e-9);
    }

    #[test]
    fn test_complexity_is_capped() {
        let code = " if x\n".repeat(200);
        let report = check_complexity(&code);
        assert_eq!(report.complexity_score, 1.0);
    }

    #[test]
    fn test_detect_issues() {
        let report = detect_issues(SAMPLE);
        assert_eq!(report.issue_count, 2);
        assert!(report.issues[0].contains("TODO"));
        assert!(report.issues[1].contains("print"));

        let report = detect_issues("from os import *\n");
        assert_eq!(report.issue_count, 1);
        assert!(report.issues[0].contains("Wildcard"));

        let report = detect_issues(&"x".repeat(2001));
        assert_eq!(report.issue_count, 1);
    }

    #[test]
    fn test_clean_code_has_no_issues() {
        let report = detect_issues("def add(a, b):\n    return a + b\n");
        assert_eq!(report.issue_count, 0);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_suggest_improvements_clean() {
        let s = suggest_improvements(&ReviewSummary {
            complexity_score: 0.1,
            issue_count: 0,
        });
        assert_eq!(s.suggestions, vec!["Code looks clean and simple. Good job!"]);
        assert!((s.quality_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_suggest_improvements_complex_with_issues() {
        let s = suggest_improvements(&ReviewSummary {
            complexity_score: 0.9,
            issue_count: 3,
        });
        assert_eq!(s.suggestions.len(), 2);
        assert!((s.quality_score - 0.25).abs() < 1e-9);

        let floor = suggest_improvements(&ReviewSummary {
            complexity_score: 1.0,
            issue_count: 20,
        });
        assert_eq!(floor.quality_score, 0.0);
    }

    #[test]
    fn test_tools_over_json() {
        let out = ExtractFunctionsTool
            .call(serde_json::json!({"code": "def a():\n"}))
            .unwrap();
        assert_eq!(out, serde_json::json!({"functions": ["a"]}));

        let out = SuggestImprovementsTool
            .call(serde_json::json!({"issue_count": 1}))
            .unwrap();
        assert_eq!(out["quality_score"], serde_json::json!(0.9));

        let err = DetectIssuesTool.call(serde_json::json!({"text": "x"})).unwrap_err();
        assert!(matches!(err, WaypointError::ToolValidation(_)));
    }
}
