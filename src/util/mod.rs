pub(crate) mod browser;

use std::cell::Cell;
use std::rc::Rc;

pub(crate) const PREVIEW_LEN: usize = 100;

/// First `max` characters of `content`, with `...` appended when truncated.
pub(crate) fn preview(content: &str, max: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Last path segment of an image URL, query string excluded.
pub(crate) fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

pub(crate) fn template_export_file_name(id: impl std::fmt::Display) -> String {
    format!("template_{id}.json")
}

pub(crate) fn report_pdf_file_name(number: &str, fallback_id: impl std::fmt::Display) -> String {
    let number = number.trim();
    if number.is_empty() {
        format!("report_{fallback_id}.pdf")
    } else {
        format!("report_{number}.pdf")
    }
}

/// Single-flight guard for user-triggered submits.
///
/// `try_begin` hands out at most one live ticket; the slot frees when the ticket drops.
#[derive(Clone, Debug, Default)]
pub struct InFlight(Rc<Cell<bool>>);

pub struct InFlightTicket(Rc<Cell<bool>>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.get()
    }

    pub fn try_begin(&self) -> Option<InFlightTicket> {
        if self.0.replace(true) {
            return None;
        }
        Some(InFlightTicket(self.0.clone()))
    }
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        let long = "a".repeat(120);
        let p = preview(&long, PREVIEW_LEN);
        assert_eq!(p.len(), 103);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short", PREVIEW_LEN), "short");
        assert_eq!(preview(&"b".repeat(100), PREVIEW_LEN), "b".repeat(100));
    }

    #[test]
    fn test_preview_counts_chars_not_bytes() {
        assert_eq!(preview("ãéíõú", 3), "ãéí...");
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("http://h:5001/static/uploads/template_2/logo.png"),
            "logo.png"
        );
        assert_eq!(file_name_from_url("/uploads/a.png?v=3"), "a.png");
        assert_eq!(file_name_from_url("plain.jpg"), "plain.jpg");
    }

    #[test]
    fn test_download_file_names() {
        assert_eq!(template_export_file_name(4), "template_4.json");
        assert_eq!(report_pdf_file_name("5001001", 9), "report_5001001.pdf");
        assert_eq!(report_pdf_file_name(" ", 9), "report_9.pdf");
    }

    #[test]
    fn test_in_flight_allows_one_ticket() {
        let guard = InFlight::new();
        let ticket = guard.try_begin().expect("first begin");
        assert!(guard.is_busy());
        assert!(guard.try_begin().is_none());
        drop(ticket);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_some());
    }
}
