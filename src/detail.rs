use scraper::{Html, Selector};
use url::Url;

use crate::listing::element_text;
use crate::models::{Anchor, Image, RawDetailContent};

/// Assemble the raw content of a rendered detail page.
///
/// `title` and `body_text` come straight from the renderer; anchors and images are read
/// from the rendered markup in document order, with links resolved against `page_url`.
pub fn parse_detail(
    page_url: &Url,
    title: &str,
    body_text: &str,
    html: &str,
) -> RawDetailContent {
    let document = Html::parse_document(html);

    let anchors = match Selector::parse("a") {
        Ok(selector) => document
            .select(&selector)
            .map(|a| Anchor {
                text: element_text(a),
                href: resolve(page_url, a.value().attr("href")),
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    let images = match Selector::parse("img") {
        Ok(selector) => document
            .select(&selector)
            .map(|img| Image {
                src: resolve(page_url, img.value().attr("src")),
                alt: img.value().attr("alt").unwrap_or("").trim().to_string(),
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    RawDetailContent {
        title: title.trim().to_string(),
        body_text: body_text.to_string(),
        anchors,
        images,
    }
}

/// Absolute form of a link, the way the browser reports `a.href` / `img.src`.
fn resolve(base: &Url, link: Option<&str>) -> String {
    match link.map(str::trim) {
        None | Some("") => String::new(),
        Some(link) => base
            .join(link)
            .map(String::from)
            .unwrap_or_else(|_| link.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://startups.gallery/companies/acme").unwrap()
    }

    #[test]
    fn test_parse_detail_resolves_links_in_order() {
        let html = r#"
            <html><body>
              <img src="/banners/acme.jpg" alt="banner">
              <img src="https://cdn.example.com/logo.png">
              <a href="https://acme.com">  Visit Website </a>
              <a href="/categories/locations/berlin">Berlin</a>
              <a>No target</a>
            </body></html>"#;

        let raw = parse_detail(&page_url(), " Acme Inc | startups.gallery ", "Acme Inc", html);

        assert_eq!(raw.title, "Acme Inc | startups.gallery");
        assert_eq!(raw.body_text, "Acme Inc");
        assert_eq!(
            raw.images,
            vec![
                Image {
                    src: "https://startups.gallery/banners/acme.jpg".to_string(),
                    alt: "banner".to_string(),
                },
                Image {
                    src: "https://cdn.example.com/logo.png".to_string(),
                    alt: String::new(),
                },
            ]
        );
        assert_eq!(raw.anchors.len(), 3);
        assert_eq!(raw.anchors[0].text, "Visit Website");
        assert_eq!(raw.anchors[0].href, "https://acme.com/");
        assert_eq!(
            raw.anchors[1].href,
            "https://startups.gallery/categories/locations/berlin"
        );
        assert_eq!(raw.anchors[2].href, "");
    }

    #[test]
    fn test_parse_detail_empty_markup() {
        let raw = parse_detail(&page_url(), "", "", "");
        assert!(raw.anchors.is_empty());
        assert!(raw.images.is_empty());
    }
}
