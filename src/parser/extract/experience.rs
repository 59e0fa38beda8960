use tracing::debug;

use crate::parser::classify::{classify, classify_claimed, Defaults, Field, DELIMITER};
use crate::parser::document::{DocumentAccessor, ItemHandle};
use crate::parser::vocab::is_job_type;
use crate::record::{not_found, or_not_found, ExperienceEntry};

// Paths relative to one experience item (or one nested role).
const LOGO_LINK: &str = "div/div[1]/a";
const HEADER: &str = "div/div[2]/div[1]/a";
const TITLE: &str = "div/div/div/div/span[1]";
const ROLES: &str = "div/div[2]/div[2]/ul/li";

const TENURE: Defaults = Defaults::split(Field::Tenurity, Field::Duration);
const PLACE: Defaults = Defaults::split(Field::Location, Field::WorkMode);
const COMPANY_SUMMARY: Defaults =
    Defaults::split(Field::JobType, Field::TotalDuration).lone(Field::TotalDuration);

/// Header line `n` of an entry: the `n`-th span under the header link.
fn line(n: usize) -> String {
    format!("{HEADER}/span[{n}]/span[1]")
}

/// How an item lays out its roles. Decided once per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    /// One role: title, company, tenure and place on the item itself.
    Flat,
    /// A company header with several roles listed beneath it.
    Nested,
}

impl ItemShape {
    pub fn of<D: DocumentAccessor + ?Sized>(doc: &D, item: &ItemHandle) -> Self {
        if doc.has_nested_list(item) {
            ItemShape::Nested
        } else {
            ItemShape::Flat
        }
    }
}

/// `Acme · Full-time` → (`Acme`, `Full-time`); a bare fragment goes to
/// whichever side the job-type table says.
fn split_company(fragment: Option<String>) -> (String, String) {
    let Some(fragment) = fragment.filter(|f| !f.trim().is_empty()) else {
        return (not_found(), not_found());
    };
    match fragment.split_once(DELIMITER) {
        Some((company, job_type)) => (
            or_not_found(Some(company.to_string())),
            or_not_found(Some(job_type.to_string())),
        ),
        None if is_job_type(&fragment) => (not_found(), fragment.trim().to_string()),
        None => (fragment.trim().to_string(), not_found()),
    }
}

fn extract_flat<D: DocumentAccessor + ?Sized>(doc: &D, item: &ItemHandle) -> ExperienceEntry {
    let read = |rel: &str| doc.read_text(&item.at(rel));

    let (company_name, job_type) = split_company(read(&line(1)));
    let mut entry = ExperienceEntry {
        job_title: or_not_found(read(&format!("{HEADER}/{TITLE}"))),
        company_name,
        company_link: or_not_found(doc.read_attribute(&item.at(LOGO_LINK), "href")),
        job_type,
        ..Default::default()
    };

    if let Some(tenure) = read(&line(2)) {
        classify(&tenure, DELIMITER, TENURE).apply_to(&mut entry);
    }
    if let Some(place) = read(&line(3)) {
        classify(&place, DELIMITER, PLACE).apply_to(&mut entry);
    }
    entry
}

fn extract_nested<D: DocumentAccessor + ?Sized>(
    doc: &D,
    item: &ItemHandle,
) -> Vec<ExperienceEntry> {
    let read = |rel: &str| doc.read_text(&item.at(rel));

    let mut company = ExperienceEntry {
        company_name: or_not_found(read(&format!("{HEADER}/{TITLE}"))),
        company_link: or_not_found(doc.read_attribute(&item.at(LOGO_LINK), "href")),
        ..Default::default()
    };
    if let Some(summary) = read(&line(1)) {
        classify(&summary, DELIMITER, COMPANY_SUMMARY).apply_to(&mut company);
    }
    if let Some(place) = read(&line(2)) {
        classify(&place, DELIMITER, PLACE).apply_to(&mut company);
    }

    let roles = doc.count(&item.at(ROLES));
    (1..=roles)
        .map(|n| {
            let role = format!("{ROLES}[{n}]/{HEADER}");
            let mut entry = ExperienceEntry {
                job_title: or_not_found(read(&format!("{role}/{TITLE}"))),
                ..company.clone()
            };

            let spans = doc.count(&item.at(&format!("{role}/span")));
            for k in 1..=spans {
                let Some(fragment) = read(&format!("{role}/span[{k}]/span[1]")) else {
                    continue;
                };
                // Role lines only count when a rule claims them.
                let c = classify_claimed(&fragment, DELIMITER);
                if c.is_empty() {
                    debug!(role = n, fragment = %fragment, rule = ?c.rule(), "ignoring role line");
                }
                c.apply_to(&mut entry);
            }
            entry
        })
        .collect()
}

/// Entries produced by one item: one for a flat item, one per role for a
/// nested one.
pub fn extract_item<D: DocumentAccessor + ?Sized>(
    doc: &D,
    item: &ItemHandle,
) -> Vec<ExperienceEntry> {
    let shape = ItemShape::of(doc, item);
    debug!(item = item.index, ?shape, "extracting experience item");
    match shape {
        ItemShape::Flat => vec![extract_flat(doc, item)],
        ItemShape::Nested => extract_nested(doc, item),
    }
}

/// All entries of the section at `ordinal`, flattened in document order.
pub fn extract_section<D: DocumentAccessor + ?Sized>(
    doc: &D,
    ordinal: usize,
) -> Vec<ExperienceEntry> {
    doc.list_items(ordinal)
        .iter()
        .flat_map(|item| extract_item(doc, item))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::document::HtmlDocument;
    use crate::record::NOT_FOUND;

    fn header(title: &str, lines: &[&str]) -> String {
        let spans: String = lines
            .iter()
            .map(|l| format!("<span><span>{l}</span><span class=\"sr\">{l}</span></span>"))
            .collect();
        format!("<a><div><div><div><div><span>{title}</span></div></div></div></div>{spans}</a>")
    }

    fn flat_item(link: &str, title: &str, lines: &[&str]) -> String {
        format!(
            "<li><div><div><a href=\"{link}\">logo</a></div><div><div>{}</div><div><ul><li><div>skills</div></li></ul></div></div></div></li>",
            header(title, lines)
        )
    }

    fn nested_item(link: &str, company: &str, lines: &[&str], roles: Vec<(&str, Vec<&str>)>) -> String {
        let roles: String = roles
            .iter()
            .map(|(title, lines)| {
                format!(
                    "<li><span class=\"dot\"></span><div><div></div><div><div>{}</div></div></div></li>",
                    header(title, lines)
                )
            })
            .collect();
        format!(
            "<li><div><div><a href=\"{link}\">logo</a></div><div><div>{}</div><div><ul>{roles}</ul></div></div></div></li>",
            header(company, lines)
        )
    }

    fn section(items: &[String]) -> HtmlDocument {
        HtmlDocument::parse(&format!(
            "<html><body><main><section></section><section><div></div><div></div><div><ul>{}</ul></div></section></main></body></html>",
            items.concat()
        ))
    }

    #[test]
    fn flat_item_reads_every_line() {
        let doc = section(&[flat_item(
            "https://example.com/company/acme",
            "Staff Engineer",
            &["Acme · Full-time", "Jan 2020 – Present · 2 yrs 3 mos", "San Francisco, CA · Remote"],
        )]);
        let entries = extract_section(&doc, 2);
        assert_eq!(
            entries,
            vec![ExperienceEntry {
                job_title: "Staff Engineer".into(),
                company_name: "Acme".into(),
                company_link: "https://example.com/company/acme".into(),
                job_type: "Full-time".into(),
                work_mode: "Remote".into(),
                location: "San Francisco, CA".into(),
                duration: "2 yrs 3 mos".into(),
                tenurity: "Jan 2020 – Present".into(),
                total_duration: NOT_FOUND.into(),
            }]
        );
    }

    #[test]
    fn flat_item_with_missing_lines() {
        let doc = section(&[flat_item("/c/solo", "Consultant", &["Freelance"])]);
        let entries = extract_section(&doc, 2);
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.job_type, "Freelance");
        assert_eq!(e.company_name, NOT_FOUND);
        assert_eq!(e.tenurity, NOT_FOUND);
        assert_eq!(e.location, NOT_FOUND);
        assert_eq!(e.work_mode, NOT_FOUND);
    }

    #[test]
    fn flat_bare_work_mode() {
        let doc = section(&[flat_item("/c/a", "Dev", &["Initech", "2019 - 2021 · 2 yrs", "Hybrid"])]);
        let e = &extract_section(&doc, 2)[0];
        assert_eq!(e.company_name, "Initech");
        assert_eq!(e.job_type, NOT_FOUND);
        assert_eq!(e.work_mode, "Hybrid");
        assert_eq!(e.location, NOT_FOUND);
        assert_eq!(e.tenurity, "2019 - 2021");
    }

    #[test]
    fn nested_item_yields_one_entry_per_role() {
        let doc = section(&[nested_item(
            "https://example.com/company/globex",
            "Globex",
            &["Full-time · 6 yrs 2 mos", "Springfield, OR"],
            vec![
                ("Director", vec!["Mar 2022 – Present · 2 yrs", "Portland, OR · Hybrid"]),
                ("Manager", vec!["Jan 2020 – Mar 2022 · 2 yrs 3 mos"]),
                ("Engineer", vec!["Contract", "2018 - 2020 · 2 yrs", "Remote"]),
            ],
        )]);
        let entries = extract_section(&doc, 2);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.company_name == "Globex"));
        assert!(entries
            .iter()
            .all(|e| e.company_link == "https://example.com/company/globex"));
        assert!(entries.iter().all(|e| e.total_duration == "6 yrs 2 mos"));

        let titles: Vec<_> = entries.iter().map(|e| e.job_title.as_str()).collect();
        assert_eq!(titles, vec!["Director", "Manager", "Engineer"]);

        assert_eq!(entries[0].tenurity, "Mar 2022 – Present");
        assert_eq!(entries[0].location, "Portland, OR");
        assert_eq!(entries[0].work_mode, "Hybrid");
        assert_eq!(entries[0].job_type, "Full-time");

        // Company-level place applies when the role has none of its own.
        assert_eq!(entries[1].location, "Springfield, OR");
        assert_eq!(entries[1].work_mode, NOT_FOUND);
        assert_eq!(entries[1].duration, "2 yrs 3 mos");

        assert_eq!(entries[2].job_type, "Contract");
        assert_eq!(entries[2].work_mode, "Remote");
        assert_eq!(entries[2].tenurity, "2018 - 2020");
    }

    #[test]
    fn role_tenure_does_not_leak_into_next_role() {
        let doc = section(&[nested_item(
            "/c/x",
            "X",
            &["Part-time"],
            vec![("A", vec!["Jan 2021 – Present · 1 yr"]), ("B", vec![])],
        )]);
        let entries = extract_section(&doc, 2);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].tenurity, NOT_FOUND);
        assert_eq!(entries[1].duration, NOT_FOUND);
        assert_eq!(entries[1].job_type, "Part-time");
        assert_eq!(entries[0].total_duration, NOT_FOUND);
    }

    #[test]
    fn mixed_items_flatten_in_order() {
        let doc = section(&[
            flat_item("/c/1", "First", &["One"]),
            nested_item("/c/2", "Two", &["3 yrs"], vec![("Second", vec![]), ("Third", vec![])]),
            flat_item("/c/3", "Fourth", &["Three · Internship"]),
        ]);
        let entries = extract_section(&doc, 2);
        let titles: Vec<_> = entries.iter().map(|e| e.job_title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third", "Fourth"]);
        assert_eq!(entries[1].total_duration, "3 yrs");
        assert_eq!(entries[1].company_name, "Two");
        assert_eq!(entries[3].job_type, "Internship");
    }

    #[test]
    fn shape_is_chosen_per_item() {
        let doc = section(&[
            flat_item("/c/1", "First", &[]),
            nested_item("/c/2", "Two", &[], vec![("Only", vec![])]),
        ]);
        let items = doc.list_items(2);
        assert_eq!(ItemShape::of(&doc, &items[0]), ItemShape::Flat);
        assert_eq!(ItemShape::of(&doc, &items[1]), ItemShape::Nested);
    }

    #[test]
    fn company_split() {
        assert_eq!(split_company(Some("Acme · Contract".into())), ("Acme".into(), "Contract".into()));
        assert_eq!(split_company(Some("Self-employed".into())), (NOT_FOUND.into(), "Self-employed".into()));
        assert_eq!(split_company(Some(" Acme ".into())), ("Acme".into(), NOT_FOUND.into()));
        assert_eq!(split_company(None), (NOT_FOUND.into(), NOT_FOUND.into()));
    }

    #[test]
    fn unclaimed_role_lines_keep_company_place() {
        let doc = section(&[nested_item(
            "/c/initech",
            "Initech",
            &["Full-time · 3 yrs", "Berlin, Germany"],
            vec![
                ("A", vec!["Jan 2024 – Present"]),
                ("B", vec!["Part-time · 6 mos"]),
            ],
        )]);
        let entries = extract_section(&doc, 2);
        assert_eq!(entries.len(), 2);
        for e in &entries {
            assert_eq!(e.location, "Berlin, Germany");
            assert_eq!(e.work_mode, NOT_FOUND);
            assert_eq!(e.tenurity, NOT_FOUND);
            assert_eq!(e.duration, NOT_FOUND);
            assert_eq!(e.job_type, "Full-time");
        }
        assert_eq!(entries[0].job_title, "A");
        assert_eq!(entries[1].job_title, "B");
    }
}
