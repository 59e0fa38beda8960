use tracing::debug;

use super::document::{section_path, DocumentAccessor};

/// Section 1 is the profile top card and never carries a named heading.
pub const SCAN_START: usize = 2;

const SECTIONS: &str = "//main/section";
const HEADING: &str = "div[2]/div/div/div/h2/span[1]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub ordinal: usize,
    pub item_count: usize,
}

fn heading_path(ordinal: usize) -> String {
    format!("{}/{}", section_path(ordinal), HEADING)
}

/// Ordinal of the first section whose heading reads `name`.
///
/// A candidate section without a heading node ends the scan with `None`,
/// even if a later section would have matched.
pub fn locate_section<D: DocumentAccessor + ?Sized>(doc: &D, name: &str) -> Option<usize> {
    let total = doc.count(SECTIONS);
    for ordinal in SCAN_START..=total {
        match doc.read_text(&heading_path(ordinal)) {
            None => {
                debug!(ordinal, name, "section without heading, giving up");
                return None;
            }
            Some(heading) if heading == name => return Some(ordinal),
            Some(_) => {}
        }
    }
    debug!(name, total, "section not present");
    None
}

/// Every headed section after the top card, in document order.
pub fn list_sections<D: DocumentAccessor + ?Sized>(doc: &D) -> Vec<Section> {
    let total = doc.count(SECTIONS);
    (SCAN_START..=total)
        .filter_map(|ordinal| {
            let name = doc.read_text(&heading_path(ordinal))?;
            Some(Section {
                name,
                ordinal,
                item_count: doc.list_items(ordinal).len(),
            })
        })
        .collect()
}

// ── Tests ──
