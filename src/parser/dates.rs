use std::sync::LazyLock;

use regex::Regex;

const MONTH: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sept?(?:ember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";
const YEAR: &str = r"(?:19|20)\d{2}";

/// `Jan 2020 – Present`, `2019 - 2021`, `March 2018 – Sep 2019`, ...
static DATE_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let date = format!(r"(?:{MONTH}\s+{YEAR}|{YEAR})");
    Regex::new(&format!(r"\b{date}\s*[–-]\s*(?:(?i:present|current)|{date})\b")).unwrap()
});

/// Every date-range substring in `text`, in order. Empty when there is none.
pub fn find_date_ranges(text: &str) -> impl Iterator<Item = &str> + '_ {
    DATE_RANGE_RE.find_iter(text).map(|m| m.as_str())
}

/// True when `text` carries at least one tenure-style date range.
pub fn looks_like_tenure(text: &str) -> bool {
    find_date_ranges(text).next().is_some()
}

// ── Tests ──
