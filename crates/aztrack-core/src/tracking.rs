use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const DEFAULT_ORGANIZATION: &str = "mseng";
pub const DEFAULT_PROJECT: &str = "AzureDevOps";

// ---------------------------------------------------------------------------
// TrackingDirective
// ---------------------------------------------------------------------------

/// Structured contents of an issue's `## AzTracking` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingDirective {
    /// Pull request ids in the order they appear, duplicates included.
    pub change_ids: Vec<u64>,
    /// When set, the issue only ever receives labels: it is never closed and
    /// its project card is never moved.
    #[serde(default)]
    pub labels_only: bool,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static LABELS_ONLY_RE: OnceLock<Regex> = OnceLock::new();
static DEFAULT_PARSER: OnceLock<TrackingParser> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"(?i)^#+\s*az.*tracking$").unwrap())
}

fn labels_only_re() -> &'static Regex {
    LABELS_ONLY_RE.get_or_init(|| Regex::new(r"(?i)(labels[\s-]*only)(:(.*))?").unwrap())
}

// ---------------------------------------------------------------------------
// TrackingParser
// ---------------------------------------------------------------------------

enum Section {
    Scanning,
    Inside,
}

/// Line scanner for tracking sections.
///
/// Pull request references are only recognised for one Azure DevOps
/// organization and project; [`TrackingParser::default`] targets
/// `mseng/AzureDevOps`.
#[derive(Debug, Clone)]
pub struct TrackingParser {
    pull_request_re: Regex,
}

impl Default for TrackingParser {
    fn default() -> Self {
        Self::for_project(DEFAULT_ORGANIZATION, DEFAULT_PROJECT)
    }
}

impl TrackingParser {
    pub fn for_project(organization: &str, project: &str) -> Self {
        let pattern = format!(
            r"https://dev\.azure\.com/{}/{}/.*/pullrequest/(\d+)",
            regex::escape(organization),
            regex::escape(project)
        );
        Self {
            pull_request_re: Regex::new(&pattern).expect("escaped pull request pattern is valid"),
        }
    }

    /// Extract the tracking directive from an issue body.
    ///
    /// Once the tracking heading is seen, every remaining line belongs to the
    /// section; later headings do not close it. Returns `None` when no
    /// heading is found or the section references no pull requests.
    pub fn parse(&self, text: &str) -> Option<TrackingDirective> {
        let mut section = Section::Scanning;
        let mut change_ids = Vec::new();
        let mut labels_only = false;

        // `lines` splits on `\n` and drops a trailing `\r`.
        for line in text.lines() {
            match section {
                Section::Scanning => {
                    if heading_re().is_match(line) {
                        section = Section::Inside;
                    }
                }
                Section::Inside => {
                    if let Some(id) = self.pull_request_id(line) {
                        change_ids.push(id);
                    }
                    if let Some(value) = labels_only_value(line) {
                        labels_only = value;
                    }
                }
            }
        }

        if change_ids.is_empty() {
            return None;
        }
        Some(TrackingDirective {
            change_ids,
            labels_only,
        })
    }

    fn pull_request_id(&self, line: &str) -> Option<u64> {
        let caps = self.pull_request_re.captures(line)?;
        caps.get(1)?.as_str().parse().ok()
    }
}

/// `Some(flag)` when the line carries a labels-only directive.
fn labels_only_value(line: &str) -> Option<bool> {
    let caps = labels_only_re().captures(line)?;
    let disabled = caps.get(2).is_some_and(|value| {
        let value = value.as_str().to_lowercase();
        value.contains("false") || value.contains("off")
    });
    Some(!disabled)
}

/// Parse with the default `mseng/AzureDevOps` parser.
pub fn parse(text: &str) -> Option<TrackingDirective> {
    DEFAULT_PARSER.get_or_init(TrackingParser::default).parse(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PR_515655: &str =
        "https://dev.azure.com/mseng/AzureDevOps/_git/AzureDevOps/pullrequest/515655";

    #[test]
    fn text_without_tracking_is_none() {
        let body = "\nFixing a typo.\nI need to learn hwo to spell.\n    ";
        assert_eq!(parse(body), None);
    }

    #[test]
    fn extracts_pull_request_and_ignores_feature_flags() {
        let body = format!(
            "\nFixing a major bug\n\n## AzTracking\n\n{PR_515655}\nFFs: Actions.Foo, Pipelines.Bar\n    "
        );
        assert_eq!(
            parse(&body),
            Some(TrackingDirective {
                change_ids: vec![515655],
                labels_only: false,
            })
        );
    }

    #[test]
    fn crlf_body_with_ffs_none() {
        let body = "## AzTracking\r\n\r\nhttps://dev.azure.com/mseng/AzureDevOps/_git/AzureDevOps/pullrequest/513094\r\nFFs: None";
        assert_eq!(
            parse(body),
            Some(TrackingDirective {
                change_ids: vec![513094],
                labels_only: false,
            })
        );
    }

    #[test]
    fn heading_variants() {
        for heading in ["# AZ Tracking", "###AzTracking", "## az pr tracking", "#aztracking"] {
            let body = format!("{heading}\n{PR_515655}");
            assert!(parse(&body).is_some(), "expected heading to match: {heading}");
        }
        for heading in ["AzTracking", "## AzTracking notes", "## Tracking"] {
            let body = format!("{heading}\n{PR_515655}");
            assert_eq!(parse(&body), None, "expected heading to be ignored: {heading}");
        }
    }

    #[test]
    fn references_before_heading_are_ignored() {
        let body = format!("{PR_515655}\n## AzTracking\nnothing here");
        assert_eq!(parse(&body), None);
    }

    #[test]
    fn heading_without_references_is_none_even_with_labels_only() {
        let body = "## AzTracking\nlabels-only\nFFs: None";
        assert_eq!(parse(body), None);
    }

    #[test]
    fn multiple_references_keep_order_and_duplicates() {
        let body = "## AzTracking\n\
            https://dev.azure.com/mseng/AzureDevOps/_git/AzureDevOps/pullrequest/3\n\
            https://dev.azure.com/mseng/AzureDevOps/_git/Other/pullrequest/1\n\
            https://dev.azure.com/mseng/AzureDevOps/_git/AzureDevOps/pullrequest/3\n";
        assert_eq!(parse(body).unwrap().change_ids, vec![3, 1, 3]);
    }

    #[test]
    fn one_reference_per_line() {
        let body = "## AzTracking\n\
            https://dev.azure.com/mseng/AzureDevOps/_git/A/pullrequest/10 and \
            https://dev.azure.com/mseng/AzureDevOps/_git/A/pullrequest/20\n";
        assert_eq!(parse(body).unwrap().change_ids, vec![20]);
    }

    #[test]
    fn section_stays_open_after_later_headings() {
        let body = format!("## AzTracking\n{PR_515655}\n## Notes\nlabels only");
        let directive = parse(&body).unwrap();
        assert_eq!(directive.change_ids, vec![515655]);
        assert!(directive.labels_only);
    }

    #[test]
    fn labels_only_spellings() {
        for line in ["labels-only", "Labels Only", "LABELSONLY", "labels - only: yes"] {
            let body = format!("## AzTracking\n{PR_515655}\n{line}");
            assert!(parse(&body).unwrap().labels_only, "expected labels-only: {line}");
        }
    }

    #[test]
    fn ffs_none_does_not_set_labels_only() {
        let body = format!("## AzTracking\n{PR_515655}\nFFs: None");
        assert!(!parse(&body).unwrap().labels_only);
    }

    #[test]
    fn later_off_value_reverses_earlier_on() {
        let body = format!("## AzTracking\nlabels-only\n{PR_515655}\nlabels-only: off");
        assert!(!parse(&body).unwrap().labels_only);

        let body = format!("## AzTracking\nlabels-only: FALSE\n{PR_515655}\nlabels only");
        assert!(parse(&body).unwrap().labels_only);
    }

    #[test]
    fn other_organizations_are_ignored() {
        let body = "## AzTracking\nhttps://dev.azure.com/contoso/Web/_git/Web/pullrequest/7";
        assert_eq!(parse(body), None);

        let parser = TrackingParser::for_project("contoso", "Web");
        assert_eq!(parser.parse(body).unwrap().change_ids, vec![7]);
    }

    #[test]
    fn overflowing_ids_are_skipped() {
        let body = format!(
            "## AzTracking\n\
             https://dev.azure.com/mseng/AzureDevOps/_git/A/pullrequest/99999999999999999999999\n\
             {PR_515655}"
        );
        assert_eq!(parse(&body).unwrap().change_ids, vec![515655]);
    }
}
