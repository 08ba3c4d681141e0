//! Element locators and their Playwright selector form

use std::fmt;

/// How to find elements on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// XPath expression, absolute or relative (`.//…`) to a scope element
    XPath(String),
    /// CSS selector
    Css(String),
    /// An `<a>` element whose normalized visible text equals the given text
    LinkText(String),
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn link_text(text: impl Into<String>) -> Self {
        Locator::LinkText(text.into())
    }

    /// Render as a Playwright selector string
    pub fn to_selector(&self) -> String {
        match self {
            Locator::XPath(expr) => format!("xpath={}", expr),
            Locator::Css(selector) => format!("css={}", selector),
            Locator::LinkText(text) => format!(
                "xpath=.//a[normalize-space(.)={}]",
                xpath_literal(text.trim())
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::XPath(expr) => write!(f, "xpath {}", expr),
            Locator::Css(selector) => write!(f, "css {}", selector),
            Locator::LinkText(text) => write!(f, "link text {:?}", text),
        }
    }
}

/// Quote a string as an XPath 1.0 literal.
///
/// XPath 1.0 has no escape sequences, so a text holding both quote kinds is
/// split on `'` and reassembled with `concat()`.
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }

    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}
