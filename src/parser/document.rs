//! Read-only access to a rendered profile page.
//!
//! Positions are written as element paths, `//main/section[3]/div[3]/ul/li`:
//! a leading `//` searches the whole tree for the first step, every other step
//! walks element children by tag name, and `[n]` keeps the n-th (1-based)
//! same-tag child of each parent. A step without `[n]` keeps all of them.
//! Paths are run as the equivalent CSS selector.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::sections;

/// Layout of the experience list inside a section.
const ITEM_LIST: &str = "div[3]/ul/li";
/// Present only on items that group several roles under one company.
const NESTED_MARKER: &str = "div/div[2]/div[2]/ul/li[1]/span";

/// One entry of a section's item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemHandle {
    pub section: usize,
    pub index: usize,
}

impl ItemHandle {
    pub fn path(&self) -> String {
        format!("{}/{}[{}]", section_path(self.section), ITEM_LIST, self.index)
    }

    /// Path of a node below this item, e.g. `at("div/div[1]/a")`.
    pub fn at(&self, rel: &str) -> String {
        format!("{}/{}", self.path(), rel)
    }
}

pub fn section_path(ordinal: usize) -> String {
    format!("//main/section[{}]", ordinal)
}

/// Capability the extraction core reads through. Implementations never wait:
/// a node is either there or absent.
pub trait DocumentAccessor {
    /// Number of nodes matched by `path`.
    fn count(&self, path: &str) -> usize;

    /// Text of the first node matched by `path`.
    fn read_text(&self, path: &str) -> Option<String>;

    /// Attribute of the first node matched by `path`.
    fn read_attribute(&self, path: &str, name: &str) -> Option<String>;

    fn locate_section(&self, name: &str) -> Option<usize> {
        sections::locate_section(self, name)
    }

    fn list_items(&self, section: usize) -> Vec<ItemHandle> {
        let total = self.count(&format!("{}/{}", section_path(section), ITEM_LIST));
        (1..=total).map(|index| ItemHandle { section, index }).collect()
    }

    fn has_nested_list(&self, item: &ItemHandle) -> bool {
        self.count(&item.at(NESTED_MARKER)) > 0
    }
}

/// CSS selector equivalent of an element path:
/// `//main/section[3]/div` → `main > section:nth-of-type(3) > div`.
/// A path not starting with `//` is anchored at the document root.
fn to_selector(path: &str) -> Option<String> {
    let (anywhere, rest) = match path.strip_prefix("//") {
        Some(rest) => (true, rest),
        None => (false, path.trim_start_matches('/')),
    };

    let steps = rest
        .split('/')
        .map(|seg| {
            let seg = seg.trim();
            let (tag, index) = match seg.split_once('[') {
                Some((tag, idx)) => {
                    let n: usize = idx.strip_suffix(']')?.trim().parse().ok()?;
                    if n == 0 {
                        return None;
                    }
                    (tag, Some(n))
                }
                None => (seg, None),
            };
            let valid = !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            valid.then(|| match index {
                Some(n) => format!("{}:nth-of-type({})", tag.to_ascii_lowercase(), n),
                None => tag.to_ascii_lowercase(),
            })
        })
        .collect::<Option<Vec<_>>>()?;

    let mut css = steps.join(" > ");
    if !anywhere {
        let first = css.find(' ').unwrap_or(css.len());
        css.insert_str(first, ":root");
    }
    Some(css)
}

/// A parsed HTML page.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    fn select(&self, path: &str) -> Vec<ElementRef<'_>> {
        let Some(css) = to_selector(path) else {
            warn!(path, "malformed element path");
            return Vec::new();
        };
        let elements = match Selector::parse(&css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                warn!(path, selector = %css, error = %e, "invalid selector");
                Vec::new()
            }
        };
        elements
    }
}

fn visible_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl DocumentAccessor for HtmlDocument {
    fn count(&self, path: &str) -> usize {
        self.select(path).len()
    }

    fn read_text(&self, path: &str) -> Option<String> {
        self.select(path).first().map(visible_text)
    }

    fn read_attribute(&self, path: &str, name: &str) -> Option<String> {
        self.select(path)
            .first()
            .and_then(|el| el.value().attr(name))
            .map(String::from)
    }
}

// ── Tests ──
