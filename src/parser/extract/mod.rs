pub mod basic;
pub mod experience;

use thiserror::Error;
use tracing::{debug, warn};

use super::document::DocumentAccessor;
use crate::record::ProfileRecord;

/// Heading of the one section a profile cannot be assembled without.
pub const EXPERIENCE: &str = "Experience";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("required section `{section}` not found")]
    MissingSection { section: &'static str },
}

/// Build the full record for one profile page.
pub fn assemble<D: DocumentAccessor + ?Sized>(doc: &D) -> Result<ProfileRecord, AssembleError> {
    if !basic::has_top_card(doc) {
        warn!("page has no profile top card");
    }
    let basic_info = basic::extract(doc);

    let ordinal = doc
        .locate_section(EXPERIENCE)
        .ok_or(AssembleError::MissingSection { section: EXPERIENCE })?;
    let experience = experience::extract_section(doc, ordinal);
    debug!(name = %basic_info.name, entries = experience.len(), "assembled profile");

    let record = ProfileRecord {
        basic_info,
        experience,
    };
    debug_assert!(record.is_fully_populated(), "empty leaf in assembled record");
    Ok(record)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::document::HtmlDocument;
    use crate::parser::sections::locate_section;
    use crate::record::NOT_FOUND;

    fn fixture(name: &str) -> HtmlDocument {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        HtmlDocument::parse(&html)
    }

    #[test]
    fn full_profile_basic_info() {
        let record = assemble(&fixture("full_profile")).unwrap();
        let b = &record.basic_info;
        assert_eq!(b.name, "Jane Doe");
        assert_eq!(b.head_line, "Platform engineer at Globex");
        assert_eq!(b.connections, "500+ connections");
        assert_eq!(b.followers, "1,204 followers");
        assert_eq!(b.about, "I build data pipelines and the teams that run them.");
        assert_eq!(b.last_activity, "2w");
    }

    #[test]
    fn full_profile_experience() {
        let record = assemble(&fixture("full_profile")).unwrap();
        let titles: Vec<_> = record.experience.iter().map(|e| e.job_title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Principal Engineer", "Senior Engineer", "Engineer", "Intern"]
        );

        let globex = &record.experience[..3];
        assert!(globex.iter().all(|e| e.company_name == "Globex"));
        assert!(globex
            .iter()
            .all(|e| e.company_link == "https://www.example.com/company/globex/"));
        assert_eq!(globex[0].tenurity, "Jan 2022 – Present");
        assert_eq!(globex[0].duration, "2 yrs 3 mos");
        assert_eq!(globex[0].total_duration, "6 yrs 4 mos");
        assert_eq!(globex[0].job_type, "Full-time");
        assert_eq!(globex[1].location, "Portland, OR");
        assert_eq!(globex[1].work_mode, "Hybrid");
        assert_eq!(globex[2].work_mode, "Remote");

        let intern = &record.experience[3];
        assert_eq!(intern.company_name, "Initech");
        assert_eq!(intern.job_type, "Internship");
        assert_eq!(intern.tenurity, "Jun 2016 – Aug 2016");
        assert_eq!(intern.duration, "3 mos");
        assert_eq!(intern.location, "Austin, Texas, United States");
        assert_eq!(intern.work_mode, "On-site");
        assert_eq!(intern.total_duration, NOT_FOUND);

        assert!(record.is_fully_populated());
    }

    #[test]
    fn missing_experience_is_fatal() {
        let err = assemble(&fixture("no_experience")).unwrap_err();
        assert_eq!(err, AssembleError::MissingSection { section: EXPERIENCE });
        assert_eq!(err.to_string(), "required section `Experience` not found");
    }

    #[test]
    fn optional_sections_fall_back() {
        let doc = fixture("no_experience");
        let b = basic::extract(&doc);
        assert_eq!(b.name, "John Roe");
        assert_eq!(b.about, NOT_FOUND);
        assert_eq!(b.connections, "87 connections");
        // No follower counter on the card; the activity header supplies it.
        assert_eq!(b.followers, "92 followers");
        assert_eq!(b.last_activity, "Congrats on the launch!");
    }

    #[test]
    fn unrelated_missing_section_leaves_record_alone() {
        let doc = fixture("full_profile");
        assert_eq!(locate_section(&doc, "Skills"), None);
        let record = assemble(&doc).unwrap();
        assert_eq!(record.basic_info, basic::extract(&doc));
        assert_eq!(record.basic_info.name, "Jane Doe");
    }

    #[test]
    fn json_round_trip_of_assembled_record() {
        let record = assemble(&fixture("full_profile")).unwrap();
        let text = serde_json::to_string_pretty(&record).unwrap();
        let back: ProfileRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn blank_page_is_missing_experience() {
        let doc = HtmlDocument::parse("<html><body><p>Sign in to view this profile</p></body></html>");
        assert!(matches!(
            assemble(&doc),
            Err(AssembleError::MissingSection { .. })
        ));
        let b = basic::extract(&doc);
        assert_eq!(b, crate::record::BasicInfo::default());
    }
}
