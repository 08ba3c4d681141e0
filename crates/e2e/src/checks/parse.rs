//! Text rules for the values read off the review page.
//!
//! These follow the page's current markup (German number formatting, `<`/`>`
//! prefixes on small percentages) and are not a stable contract.

use crate::error::{E2eError, E2eResult};

/// Parse a grade shown with a comma decimal separator, e.g. `"4,50"`.
pub fn parse_grade(text: &str) -> E2eResult<f64> {
    let normalized = text.trim().replace(',', ".");
    normalized.parse::<f64>().map_err(|_| E2eError::Parse {
        what: "grade",
        input: text.to_string(),
    })
}

/// Drop every whitespace character, including newlines and tabs.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether `passage` occurs in `text` once whitespace is ignored on both sides.
pub fn contains_passage(text: &str, passage: &str) -> bool {
    strip_whitespace(text).contains(&strip_whitespace(passage))
}

/// Parse a bucket percentage such as `"37"` or `"<1"`.
pub fn parse_percentage(text: &str) -> E2eResult<i64> {
    let cleaned = text.replace(['<', '>'], "");
    let cleaned = cleaned.trim();
    cleaned.parse::<i64>().map_err(|_| E2eError::Parse {
        what: "percentage",
        input: text.to_string(),
    })
}

/// Parse and sum the bucket percentages.
pub fn sum_percentages<S: AsRef<str>>(texts: &[S]) -> E2eResult<i64> {
    texts.iter().try_fold(0i64, |sum, text| {
        let text = text.as_ref();
        sum.checked_add(parse_percentage(text)?)
            .ok_or_else(|| E2eError::Parse {
                what: "percentage sum",
                input: text.to_string(),
            })
    })
}
