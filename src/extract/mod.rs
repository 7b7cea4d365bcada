//! Page content extraction
//!
//! Everything here is pure: it takes page text and returns typed values.
//! Fetching lives in the crawler module.

mod detail;
mod embedded;
mod fields;
mod linked_data;
mod normalize;
mod sections;

pub use detail::{parse_detail_page, posting_from_embedded, ExtractError, ExtractSettings};
pub use embedded::{
    carve_object, escape_fragment, extract_embedded_object, extract_from_payload,
    reconstruct_payload, unescape_fragment, EmbeddedError,
};
pub use linked_data::{category_from_title, find_job_posting, read_page_meta, PageMeta};
pub use normalize::{
    extract_education, map_employment_type, map_employment_types, normalize_education,
    parse_date, parse_timestamp, today_kst, EducationLevel,
};
pub use sections::{classify_sections, match_heading, Section};
