//! Source page fetching and HTML extraction.
//!
//! This crate provides:
//! - [`fetch`] — timeout-bounded HTTP fetcher for source pages
//! - [`extract`] — image descriptions and visible text from HTML

pub mod extract;
pub mod fetch;

pub use extract::{Extraction, REMOVED_ELEMENTS, extract, extract_page};
pub use fetch::{FetchedPage, Fetcher};

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn faq_fixture_keeps_main_content() {
        let out = extract(&load_fixture("registration-faq.html"));

        assert!(out.text.contains("How do I register for classes?"));
        assert!(out.text.contains("What is a registration hold?"));
        assert!(out.text.contains("prerequisite override"));
    }

    #[test]
    fn faq_fixture_drops_chrome() {
        let out = extract(&load_fixture("registration-faq.html"));

        for chrome in [
            "University Home",
            "Search the site",
            "Outreach",
            "Related Links",
            "Campus News",
            "Copyright",
            "trackPageView",
            "dataLayer",
            "font-family",
        ] {
            assert!(!out.text.contains(chrome), "chrome text {chrome:?} leaked");
        }
    }

    #[test]
    fn faq_fixture_describes_images_in_order() {
        let out = extract(&load_fixture("registration-faq.html"));
        let rendered: Vec<String> = out.images.iter().map(ToString::to_string).collect();

        assert_eq!(
            rendered,
            vec![
                "[IMAGE DESCRIPTION: Registration tab in My Missouri State - Choose Register for Classes under the Registration tab]",
                "[IMAGE DESCRIPTION: DegreeWorks audit - Use DegreeWorks to confirm which requirements a course satisfies.]",
            ]
        );
    }

    #[test]
    fn advising_fixture_keeps_table_text() {
        let out = extract(&load_fixture("advising.html"));

        assert!(out.text.contains("Advising contacts"));
        assert!(out.text.contains("Advise@MissouriState.edu"));
        assert!(!out.text.contains("Student Affairs"));
        assert!(!out.text.contains("University Hall 109"));
        assert!(out.images.is_empty());
    }
}
