// =============================================================================
// scrapers/html.rs - SELECTOR PLUMBING
// =============================================================================
//
// Small helpers on top of the `scraper` crate so the per-site parsers read
// like a list of CSS selectors instead of a pile of iterator chains. Selector
// strings are parsed on use; an invalid selector simply matches nothing.
// =============================================================================

use scraper::{ElementRef, Html, Selector};

pub fn first_element<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

pub fn first_within<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    scope.select(&selector).next()
}

/// Visible text of an element with runs of whitespace collapsed.
/// Empty text counts as missing.
pub fn text_of(element: ElementRef<'_>) -> Option<String> {
    let joined = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

pub fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    first_within(scope, css).and_then(text_of)
}

/// First non-empty text among several candidate selectors. Sites reshuffle
/// their markup every few months; this lets a parser list old and new.
pub fn first_text_of_any(scope: ElementRef<'_>, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|css| first_text(scope, css))
}

pub fn first_attr(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    first_within(scope, css)
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalise a price string to its first amount: currency symbols and
/// thousands separators dropped, `.` as the decimal point. A range such as
/// "$24.99 - $59.99" yields the low end. Non-numeric prices ("Free to Play")
/// are kept as-is.
pub fn clean_price(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let token: String = trimmed
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let token = token.trim_end_matches(&['.', ','][..]);
    if token.is_empty() {
        return Some(trimmed.to_string());
    }
    Some(normalise_separators(token))
}

/// The last separator is the decimal point when both kinds appear. A lone
/// comma followed by exactly two digits is a decimal comma ("19,99").
fn normalise_separators(token: &str) -> String {
    let decimal = match (token.rfind('.'), token.rfind(',')) {
        (Some(dot), Some(comma)) => Some(dot.max(comma)),
        (Some(dot), None) => Some(dot),
        (None, Some(comma)) if token.matches(',').count() == 1 && token.len() - comma == 3 => {
            Some(comma)
        }
        _ => None,
    };
    token
        .char_indices()
        .filter_map(|(i, c)| match c {
            '0'..='9' => Some(c),
            _ if Some(i) == decimal => Some('.'),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<div><span>  Elden \n\t Ring </span></div>");
        let root = first_element(&doc, "div").unwrap();
        assert_eq!(first_text(root, "span").as_deref(), Some("Elden Ring"));
    }

    #[test]
    fn test_missing_and_invalid_selectors_yield_none() {
        let doc = Html::parse_fragment("<div><img src=''></div>");
        let root = first_element(&doc, "div").unwrap();
        assert!(first_text(root, "span").is_none());
        assert!(first_attr(root, "img", "src").is_none());
        assert!(first_element(&doc, "div[[[").is_none());
    }

    #[test]
    fn test_clean_price() {
        assert_eq!(clean_price("$1,059.99").as_deref(), Some("1059.99"));
        assert_eq!(clean_price(" 19.99€ ").as_deref(), Some("19.99"));
        assert_eq!(clean_price("Free to Play").as_deref(), Some("Free to Play"));
        assert_eq!(clean_price("$59").as_deref(), Some("59"));
        assert!(clean_price("   ").is_none());
    }

    #[test]
    fn test_clean_price_decimal_comma_and_ranges() {
        assert_eq!(clean_price("19,99€").as_deref(), Some("19.99"));
        assert_eq!(clean_price("1.299,99 €").as_deref(), Some("1299.99"));
        assert_eq!(clean_price("$1,059").as_deref(), Some("1059"));
        assert_eq!(clean_price("$24.99 - $59.99").as_deref(), Some("24.99"));
    }
}
