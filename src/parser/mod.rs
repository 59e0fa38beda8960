pub mod classify;
pub mod dates;
pub mod document;
pub mod extract;
pub mod sections;
pub mod vocab;

use crate::db::FetchedPage;
use crate::record::ProfileRecord;
use document::HtmlDocument;
use extract::AssembleError;

/// Two-step pipeline: HTML → document → profile record.
pub fn process_page(page: &FetchedPage) -> Result<ProfileRecord, AssembleError> {
    let doc = HtmlDocument::parse(&page.html);
    extract::assemble(&doc)
}
