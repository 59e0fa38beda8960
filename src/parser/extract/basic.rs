use crate::parser::document::{section_path, DocumentAccessor};
use crate::record::{or_not_found, BasicInfo, NOT_FOUND};

const TOP_CARD: &str = "//main/section[1]/div[2]";
const NAME: &str = "div[2]/div[1]/div[1]/span/a/h1";
const HEADLINE: &str = "div[2]/div[1]/div[2]";
const COUNTERS: &str = "ul/li";

const ABOUT_TEXT: &str = "div[3]/div/div/div/span[1]";

const LATEST_POST: &str = "div[4]/div/div/div[1]/div[2]/section/div[2]/div/ul/li[1]/div/div/div/div/div/div/div/div/div/div/span/span[2]";
const LATEST_COMMENT: &str = "div[4]/div/div/div[1]/ul/li[1]/div/div/a/div/span/span[2]";
const ACTIVITY_FOLLOWERS: &str = "div[2]/div/div/div/p/span[1]";

/// Post timestamps read like `3d • Edited • 🌐`; only the age is kept.
const POST_META_SEPARATOR: char = '•';

pub fn extract<D: DocumentAccessor + ?Sized>(doc: &D) -> BasicInfo {
    let card = |rel: &str| doc.read_text(&format!("{TOP_CARD}/{rel}"));

    let mut info = BasicInfo {
        name: or_not_found(card(NAME)),
        head_line: or_not_found(card(HEADLINE)),
        ..Default::default()
    };

    let counters = doc.count(&format!("{TOP_CARD}/{COUNTERS}"));
    for i in 1..=counters {
        let Some(text) = card(&format!("{COUNTERS}[{i}]")) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        if text.ends_with("connections") {
            info.connections = text;
        } else {
            info.followers = text;
        }
    }

    if let Some(about) = doc.locate_section("About") {
        info.about = or_not_found(doc.read_text(&format!("{}/{ABOUT_TEXT}", section_path(about))));
    }

    if let Some(activity) = doc.locate_section("Activity") {
        let at = |rel: &str| doc.read_text(&format!("{}/{rel}", section_path(activity)));

        info.last_activity = match at(LATEST_POST) {
            Some(post) => or_not_found(post.split(POST_META_SEPARATOR).next().map(String::from)),
            None => or_not_found(at(LATEST_COMMENT)),
        };

        if info.followers == NOT_FOUND {
            info.followers = or_not_found(at(ACTIVITY_FOLLOWERS));
        }
    }

    info
}

/// False for pages without a profile top card (login walls, error pages).
pub fn has_top_card<D: DocumentAccessor + ?Sized>(doc: &D) -> bool {
    doc.count(TOP_CARD) > 0
}
