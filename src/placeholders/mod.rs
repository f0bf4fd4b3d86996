/// A catalog entry for the placeholder insertion menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placeholder {
    pub token: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// Current token that supersedes a legacy alias.
    pub replaced_by: Option<&'static str>,
}

impl Placeholder {
    pub fn is_legacy(&self) -> bool {
        self.replaced_by.is_some()
    }
}

const fn entry(token: &'static str, label: &'static str, description: &'static str) -> Placeholder {
    Placeholder {
        token,
        label,
        description,
        replaced_by: None,
    }
}

const fn legacy(
    token: &'static str,
    label: &'static str,
    description: &'static str,
    replaced_by: &'static str,
) -> Placeholder {
    Placeholder {
        token,
        label,
        description,
        replaced_by: Some(replaced_by),
    }
}

pub const REPORT_NUMBER: &str = "{{REPORT_NUMBER}}";
pub const REPORT_TITLE: &str = "{{REPORT_TITLE}}";
pub const REPORT_CLIENT: &str = "{{REPORT_CLIENT}}";

static CATALOG: [Placeholder; 12] = [
    entry(REPORT_NUMBER, "Report number", "e.g. 5001001"),
    entry(REPORT_TITLE, "Report title", "Title of the current report"),
    entry(REPORT_CLIENT, "Client", "Client name of the current report"),
    entry("{{CURRENT_DATE}}", "Current date", "e.g. 26/06/2025"),
    entry("{{CURRENT_DATE_FULL}}", "Full date", "e.g. 26 June 2025"),
    entry("{{CURRENT_YEAR}}", "Current year", "e.g. 2025"),
    entry("{{CURRENT_MONTH}}", "Current month", "e.g. 06"),
    entry("{{CURRENT_DAY}}", "Current day", "e.g. 26"),
    entry("{{COMPANY_NAME}}", "Company name", "Company name from the PDF settings"),
    legacy(
        "{{PROPOSAL_NUMBER}}",
        "Report number (old)",
        "Kept for older content",
        REPORT_NUMBER,
    ),
    legacy(
        "{{PROPOSAL_TITLE}}",
        "Report title (old)",
        "Kept for older content",
        REPORT_TITLE,
    ),
    legacy(
        "{{CLIENT_NAME}}",
        "Client name (old)",
        "Kept for older content",
        REPORT_CLIENT,
    ),
];

/// Every known placeholder, current tokens first, legacy aliases last.
pub fn catalog() -> &'static [Placeholder] {
    &CATALOG
}

pub fn lookup(token: &str) -> Option<&'static Placeholder> {
    CATALOG.iter().find(|p| p.token == token)
}

/// Append a literal token to existing content.
///
/// No escaping, no catalog check, no deduplication.
pub fn insert(content: &str, token: &str) -> String {
    let mut out = String::with_capacity(content.len() + token.len());
    out.push_str(content);
    out.push_str(token);
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    /// The full `{{...}}` token, braces included.
    Token(String),
}

/// Split content into plain text and `{{...}}` tokens.
///
/// - The first `}}` after a `{{` closes the token.
/// - An unclosed `{{` is plain text.
pub fn scan(input: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(open) = rest.find("{{") else {
            out.push(Segment::Text(rest.to_string()));
            break;
        };
        let Some(close_rel) = rest[open + 2..].find("}}") else {
            out.push(Segment::Text(rest.to_string()));
            break;
        };
        let close = open + 2 + close_rel + 2;

        if open > 0 {
            out.push(Segment::Text(rest[..open].to_string()));
        }
        out.push(Segment::Token(rest[open..close].to_string()));
        rest = &rest[close..];
    }

    out
}

/// Distinct tokens used in `content`, in first-appearance order.
pub fn tokens_in(content: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for seg in scan(content) {
        if let Segment::Token(t) = seg {
            if !seen.contains(&t) {
                seen.push(t);
            }
        }
    }
    seen
}

/// Tokens in `content` that the catalog does not know.
pub fn unknown_tokens(content: &str) -> Vec<String> {
    tokens_in(content)
        .into_iter()
        .filter(|t| lookup(t).is_none())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contains_all_current_and_legacy_tokens() {
        let tokens: Vec<&str> = catalog().iter().map(|p| p.token).collect();
        for t in [
            "{{REPORT_NUMBER}}",
            "{{REPORT_TITLE}}",
            "{{REPORT_CLIENT}}",
            "{{CURRENT_DATE}}",
            "{{CURRENT_DATE_FULL}}",
            "{{CURRENT_YEAR}}",
            "{{CURRENT_MONTH}}",
            "{{CURRENT_DAY}}",
            "{{COMPANY_NAME}}",
            "{{PROPOSAL_NUMBER}}",
            "{{PROPOSAL_TITLE}}",
            "{{CLIENT_NAME}}",
        ] {
            assert!(tokens.contains(&t), "missing {t}");
        }
        let legacy: Vec<&str> = catalog()
            .iter()
            .filter(|p| p.is_legacy())
            .map(|p| p.token)
            .collect();
        assert_eq!(
            legacy,
            vec!["{{PROPOSAL_NUMBER}}", "{{PROPOSAL_TITLE}}", "{{CLIENT_NAME}}"]
        );
    }

    #[test]
    fn test_legacy_alias_points_to_current_token() {
        let p = lookup("{{CLIENT_NAME}}").expect("legacy token in catalog");
        assert_eq!(p.replaced_by, Some(REPORT_CLIENT));
    }

    #[test]
    fn test_insert_appends_literal_token() {
        assert_eq!(insert("Number: ", REPORT_NUMBER), "Number: {{REPORT_NUMBER}}");
    }

    #[test]
    fn test_insert_allows_duplicates_and_unknown_tokens() {
        let once = insert("", REPORT_NUMBER);
        let twice = insert(&once, REPORT_NUMBER);
        assert_eq!(twice, "{{REPORT_NUMBER}}{{REPORT_NUMBER}}");
        assert_eq!(insert("x", "{{NOPE}}"), "x{{NOPE}}");
    }

    #[test]
    fn test_scan_splits_text_and_tokens() {
        let segs = scan("Client: {{REPORT_CLIENT}}, year {{CURRENT_YEAR}}.");
        assert_eq!(
            segs,
            vec![
                Segment::Text("Client: ".to_string()),
                Segment::Token("{{REPORT_CLIENT}}".to_string()),
                Segment::Text(", year ".to_string()),
                Segment::Token("{{CURRENT_YEAR}}".to_string()),
                Segment::Text(".".to_string()),
            ]
        );
    }

    #[test]
    fn test_scan_unclosed_token_is_text() {
        assert_eq!(
            scan("a {{REPORT_NUMBER"),
            vec![Segment::Text("a {{REPORT_NUMBER".to_string())]
        );
        assert!(scan("").is_empty());
    }

    #[test]
    fn test_tokens_in_dedups_and_flags_unknown() {
        let content = "{{REPORT_NUMBER}} {{FOO}} {{REPORT_NUMBER}}";
        assert_eq!(tokens_in(content), vec!["{{REPORT_NUMBER}}", "{{FOO}}"]);
        assert_eq!(unknown_tokens(content), vec!["{{FOO}}"]);
    }
}
