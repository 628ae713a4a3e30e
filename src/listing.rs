use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::models::CompanyPreview;

/// Anchors on the listing page that point at a company detail page.
pub const COMPANY_LINK_SELECTOR: &str = r#"a[href*="/companies/"]"#;

/// Extract company previews from the rendered listing page.
///
/// Cards without a slug are dropped and a slug seen twice keeps its first card.
pub fn parse_previews(html: &str) -> Vec<CompanyPreview> {
    let document = Html::parse_document(html);

    let (Ok(card_selector), Ok(heading_selector), Ok(paragraph_selector)) = (
        Selector::parse(COMPANY_LINK_SELECTOR),
        Selector::parse("h1, h2, h3, h4, h5, h6"),
        Selector::parse("p"),
    ) else {
        return Vec::new();
    };

    let cards = document.select(&card_selector).map(|card| {
        let href = card.value().attr("href").unwrap_or("");
        CompanyPreview {
            slug: slug_from_href(href),
            name: first_text(card, &heading_selector),
            tagline: first_text(card, &paragraph_selector),
        }
    });

    dedup_previews(cards)
}

/// First occurrence of each slug wins; empty slugs are discarded. Order is preserved.
pub fn dedup_previews(previews: impl IntoIterator<Item = CompanyPreview>) -> Vec<CompanyPreview> {
    let mut seen: HashSet<String> = HashSet::new();
    previews
        .into_iter()
        .filter(|p| !p.slug.is_empty() && seen.insert(p.slug.clone()))
        .collect()
}

/// Final path segment of a company link, ignoring any query or fragment.
pub fn slug_from_href(href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or("");
    path.rsplit('/').next().unwrap_or("").trim().to_string()
}

fn first_text(element: ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// Visible text of an element with runs of whitespace collapsed.
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(slug: &str, name: &str, tagline: &str) -> CompanyPreview {
        CompanyPreview {
            slug: slug.to_string(),
            name: name.to_string(),
            tagline: tagline.to_string(),
        }
    }

    #[test]
    fn test_parse_previews_reads_cards() {
        let html = r#"
            <html><body>
              <nav><a href="/about">About</a></nav>
              <a href="/companies/acme"><h3> Acme Inc </h3><p>
                  We build widgets </p></a>
              <a href="https://startups.gallery/companies/globex"><div><h3>Globex</h3></div></a>
            </body></html>"#;

        let previews = parse_previews(html);
        assert_eq!(
            previews,
            vec![
                preview("acme", "Acme Inc", "We build widgets"),
                preview("globex", "Globex", ""),
            ]
        );
    }

    #[test]
    fn test_parse_previews_first_occurrence_wins() {
        let html = r#"
            <a href="/companies/acme"><h3>Acme</h3><p>first</p></a>
            <a href="/companies/initech"><h3>Initech</h3></a>
            <a href="/companies/acme"><h3>Acme (again)</h3><p>second</p></a>
        "#;

        let previews = parse_previews(html);
        assert_eq!(previews.len(), 2);
        assert_eq!(previews[0], preview("acme", "Acme", "first"));
        assert_eq!(previews[1].slug, "initech");
    }

    #[test]
    fn test_parse_previews_drops_empty_slug() {
        let html = r#"
            <a href="/companies/"><h3>Directory</h3></a>
            <a href="/companies/acme"><h3>Acme</h3></a>
        "#;

        let previews = parse_previews(html);
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].slug, "acme");
    }

    #[test]
    fn test_parse_previews_no_cards() {
        assert!(parse_previews("<html><body><p>Loading…</p></body></html>").is_empty());
    }

    #[test]
    fn test_dedup_previews_keeps_order() {
        let input = vec![
            preview("b", "B", ""),
            preview("a", "A", ""),
            preview("b", "B2", "dup"),
            preview("", "Nameless", ""),
            preview("c", "C", ""),
        ];
        let slugs: Vec<String> = dedup_previews(input).into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_slug_from_href() {
        assert_eq!(slug_from_href("/companies/acme"), "acme");
        assert_eq!(slug_from_href("https://startups.gallery/companies/acme?ref=home"), "acme");
        assert_eq!(slug_from_href("/companies/acme#top"), "acme");
        assert_eq!(slug_from_href("/companies/"), "");
        assert_eq!(slug_from_href(""), "");
    }
}
