use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::config::TITLE_SUFFIX;
use crate::models::{CompanyRecord, RawDetailContent};

const VISIT_WEBSITE_LABEL: &str = "Visit Website";
const VIEW_JOBS_LABEL: &str = "View Jobs";

/// Lines containing any of these are page chrome, never a tagline.
const TAGLINE_BOILERPLATE: [&str; 5] = ["Visit", "View", "Raised", "Backed by", "Get Updates"];
const DESCRIPTION_EXCLUDES: [&str; 3] = ["Raised", "Posted on", "Explore similar"];
const SEPARATOR: &str = "·";

const MAX_TAGLINE_CHARS: usize = 100;
const MIN_DESCRIPTION_CHARS: usize = 101;

static FUNDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Raised \$[\d.]+[MBK]+ (Seed|Series [A-Z]|Pre-Seed|Venture) on .+$")
        .expect("funding announcement pattern")
});

static TEAM_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+[-–]\d+)\b").expect("team size pattern"));

/// Where the line scan is in the page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    SeekingName,
    SeekingTagline,
    SeekingDescription,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Location,
    FundingStage,
    Industry,
    WorkType,
}

impl Category {
    fn from_href(href: &str) -> Option<Self> {
        if href.contains("/categories/locations/") {
            Some(Category::Location)
        } else if href.contains("/categories/stages/") {
            Some(Category::FundingStage)
        } else if href.contains("/categories/industries/") {
            Some(Category::Industry)
        } else if href.contains("/categories/work-type/") {
            Some(Category::WorkType)
        } else {
            None
        }
    }
}

/// Turn a rendered detail page into a company record. Never fails; anything not found
/// stays empty.
pub fn extract_record(
    slug: &str,
    raw: &RawDetailContent,
    fetched_at: DateTime<Utc>,
) -> CompanyRecord {
    let mut record = CompanyRecord {
        name: company_name(&raw.title),
        slug: slug.to_string(),
        last_fetched: fetched_at,
        fully_scraped: true,
        ..Default::default()
    };

    if let Some(banner) = raw.images.first() {
        record.banner_url = banner.src.clone();
    }
    if let Some(logo) = raw.images.get(1) {
        record.logo_url = logo.src.clone();
    }

    apply_anchors(&mut record, raw);
    scan_body(&mut record, &raw.body_text);

    record.funding_announcement = funding_announcement(&raw.body_text);
    record.team_size = team_size(&raw.body_text);

    if record.name.is_empty() {
        debug!(slug, "detail page has no title; name left empty");
    }
    if record.description.is_empty() {
        debug!(slug, "no description paragraph found");
    }

    record
}

/// Page title without the site suffix.
pub fn company_name(title: &str) -> String {
    title.strip_suffix(TITLE_SUFFIX).unwrap_or(title).to_string()
}

fn apply_anchors(record: &mut CompanyRecord, raw: &RawDetailContent) {
    for anchor in &raw.anchors {
        let text = anchor.text.trim();

        if text == VISIT_WEBSITE_LABEL {
            record.website_url = anchor.href.clone();
        } else if text == VIEW_JOBS_LABEL {
            record.jobs_url = anchor.href.clone();
        }

        // a page listing several tags of one kind keeps the last
        let field = match Category::from_href(&anchor.href) {
            Some(Category::Location) => &mut record.location,
            Some(Category::FundingStage) => &mut record.funding_stage,
            Some(Category::Industry) => &mut record.industry,
            Some(Category::WorkType) => &mut record.work_type,
            None => continue,
        };
        *field = text.to_string();
    }
}

/// One pass over the body lines: find the name, then a tagline, then the description.
fn scan_body(record: &mut CompanyRecord, body_text: &str) {
    let mut state = Scan::SeekingName;

    for line in body_text.lines().map(str::trim) {
        if state == Scan::Done {
            break;
        }

        if !record.name.is_empty() && line == record.name {
            if state == Scan::SeekingName {
                state = Scan::SeekingTagline;
            }
            continue;
        }

        if state == Scan::SeekingName {
            continue;
        }

        let len = line.chars().count();

        if state == Scan::SeekingTagline {
            if is_tagline_boilerplate(line) {
                continue;
            }
            if len > 1 && len < MAX_TAGLINE_CHARS {
                record.tagline = line.to_string();
                state = Scan::SeekingDescription;
                continue;
            }
        }

        if len >= MIN_DESCRIPTION_CHARS
            && !DESCRIPTION_EXCLUDES.iter().any(|marker| line.contains(marker))
        {
            record.description = line.to_string();
            state = Scan::Done;
        }
    }
}

fn is_tagline_boilerplate(line: &str) -> bool {
    line.is_empty()
        || line == SEPARATOR
        || TAGLINE_BOILERPLATE.iter().any(|marker| line.contains(marker))
}

/// First body line of the form `Raised $<amount><M|B|K> <round> on <date>`.
pub fn funding_announcement(body_text: &str) -> Option<String> {
    body_text
        .lines()
        .map(str::trim)
        .find(|line| FUNDING_RE.is_match(line))
        .map(str::to_string)
}

/// First `<digits>-<digits>` range anywhere in the body (hyphen or en-dash).
pub fn team_size(body_text: &str) -> String {
    TEAM_SIZE_RE
        .captures(body_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
