//! Best-effort extraction of the image link and executive summary from a response.
//!
//! Both extractions are deliberately narrow: the first image reference only, and the
//! literal, case-sensitive `Executive summary` heading.

use regex::Regex;
use serde::Serialize;

lazy_static::lazy_static! {
    static ref IMAGE_PATTERN: Regex = Regex::new(r"\(/TempImageProxy/[^)]+\)").unwrap();
    static ref SUMMARY_PATTERN: Regex = Regex::new(r"(?s)Executive summary\s*(.*)").unwrap();
}

/// What a single response yielded besides its text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseArtifacts {
    pub image_url: Option<String>,
    pub executive_summary: Option<String>,
}

impl ResponseArtifacts {
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.executive_summary.is_none()
    }
}

/// Joins the first `(/TempImageProxy/...)` reference onto `base_url`.
pub fn extract_image_url(response: &str, base_url: &str) -> Option<String> {
    let found = IMAGE_PATTERN.find(response)?.as_str();
    let path = &found[1..found.len() - 1];
    Some(format!("{}{}", base_url, path))
}

pub fn extract_executive_summary(response: &str) -> Option<String> {
    SUMMARY_PATTERN
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

pub fn annotate(response: &str, image_base_url: &str) -> ResponseArtifacts {
    ResponseArtifacts {
        image_url: extract_image_url(response, image_base_url),
        executive_summary: extract_executive_summary(response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://uat-shell-e-chat.shell.com/api";

    #[test]
    fn test_image_url() {
        let response = "Here is the chart ![plot](/TempImageProxy/abc123) as requested.";
        assert_eq!(
            extract_image_url(response, BASE).as_deref(),
            Some("https://uat-shell-e-chat.shell.com/api/TempImageProxy/abc123")
        );
    }

    #[test]
    fn test_only_first_image_is_used() {
        let response = "(/TempImageProxy/first) and (/TempImageProxy/second)";
        assert_eq!(
            extract_image_url(response, BASE).as_deref(),
            Some("https://uat-shell-e-chat.shell.com/api/TempImageProxy/first")
        );
    }

    #[test]
    fn test_no_image() {
        assert_eq!(extract_image_url("no pictures here", BASE), None);
        assert_eq!(extract_image_url("/TempImageProxy/abc without parens", BASE), None);
        assert_eq!(extract_image_url("(/TempImageProxy/)", BASE), None);
    }

    #[test]
    fn test_executive_summary() {
        let response = "...\nExecutive summary\nFoo bar baz.\n";
        assert_eq!(extract_executive_summary(response).as_deref(), Some("Foo bar baz."));
    }

    #[test]
    fn test_summary_spans_lines_to_end() {
        let response = "Intro\nExecutive summary:\n- point one\n- point two\n\n";
        assert_eq!(
            extract_executive_summary(response).as_deref(),
            Some(":\n- point one\n- point two")
        );
    }

    #[test]
    fn test_summary_heading_is_literal() {
        assert_eq!(extract_executive_summary("Summary\nFoo"), None);
        assert_eq!(extract_executive_summary("EXECUTIVE SUMMARY\nFoo"), None);
        assert_eq!(extract_executive_summary("Key findings: everything is fine"), None);
    }

    #[test]
    fn test_empty_summary_body() {
        assert_eq!(extract_executive_summary("Executive summary   \n").as_deref(), Some(""));
    }

    #[test]
    fn test_annotate_both_and_neither() {
        let both = annotate(
            "Executive summary\nCosts dropped. See (/TempImageProxy/img-9).",
            BASE,
        );
        assert_eq!(
            both.image_url.as_deref(),
            Some("https://uat-shell-e-chat.shell.com/api/TempImageProxy/img-9")
        );
        assert_eq!(
            both.executive_summary.as_deref(),
            Some("Costs dropped. See (/TempImageProxy/img-9).")
        );

        let neither = annotate("plain text", BASE);
        assert!(neither.is_empty());
    }
}
