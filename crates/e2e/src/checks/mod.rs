//! The review page checks
//!
//! Each check assumes a fresh page already navigated to the target URL and
//! performs one linear locate → read → assert sequence.

pub mod parse;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;
use crate::wait::{require_present, wait_all_visible, wait_present, wait_visible, WaitConfig};

pub const DEFAULT_TARGET_URL: &str =
    "https://www.trustedshops.de/bewertung/info_X77B11C1B8A5ABA16DDEC0C30E7996C21.html";

// The page's class names are hashed, so structural XPaths are used where no
// stable hook exists.
const GRADE_XPATH: &str = r#"//*[@id="top"]/div/div[4]/div[2]/div[1]/div[1]/div[2]/span"#;
const GRADE_LINK_TEXT: &str = "Wie berechnet sich die Note?";
const MODAL_CSS: &str = r#"div[data-test="modal-dialogue"]"#;
const GRADE_SCALE_PASSAGE: &str = "Notenberechnung auf Basis der Sternevergabe
    5.00 - 4.50 Sehr gut
    4.49 - 3.50 Gut
    3.49 - 2.50 Befriedigend
    2.49 - 1.50 Ausreichend
    1.49 - 1.00 Mangelhaft";
const TWO_STAR_FILTER_XPATH: &str = r#"//div[contains(@class,"bRvmSR")]/a[4]"#;
const REVIEW_BLOCK_XPATH: &str = r#"//div[contains(@class,"chcERM")]"#;
const HIGHLIGHTED_STAR_XPATH: &str = ".//*[contains(@style, 'color: rgb(255, 220, 15)')]";
const STAR_PERCENT_XPATH: &str = r#"//*[@id="top"]/div/div[4]/div[2]/div[2]/div[1]/a/div[3]/span[1]"#;

const EXPECTED_STARS: usize = 2;
const MAX_PERCENT_SUM: i64 = 100;

/// What a passing check established
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The assertions ran and held
    Verified,
    /// The page had nothing to assert on; tolerated, counts as a pass
    NothingToCheck(String),
}

/// One independent check against the review page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewCheck {
    Title,
    GradeVisible,
    GradeExplanation,
    TwoStarFilter,
    StarPercentages,
}

impl ReviewCheck {
    pub const ALL: [ReviewCheck; 5] = [
        ReviewCheck::Title,
        ReviewCheck::GradeVisible,
        ReviewCheck::GradeExplanation,
        ReviewCheck::TwoStarFilter,
        ReviewCheck::StarPercentages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReviewCheck::Title => "title",
            ReviewCheck::GradeVisible => "grade_visible",
            ReviewCheck::GradeExplanation => "grade_explanation",
            ReviewCheck::TwoStarFilter => "two_star_filter",
            ReviewCheck::StarPercentages => "star_percentages",
        }
    }

    /// Run the check against a loaded page
    pub async fn run<P>(&self, page: &P, wait: &WaitConfig) -> E2eResult<CheckOutcome>
    where
        P: Page + ?Sized,
    {
        debug!("Running check: {}", self.name());
        match self {
            ReviewCheck::Title => check_title(page).await,
            ReviewCheck::GradeVisible => check_grade(page, wait).await,
            ReviewCheck::GradeExplanation => check_grade_explanation(page, wait).await,
            ReviewCheck::TwoStarFilter => check_two_star_filter(page, wait).await,
            ReviewCheck::StarPercentages => check_star_percentages(page, wait).await,
        }
    }
}

impl fmt::Display for ReviewCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReviewCheck {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewCheck::ALL
            .into_iter()
            .find(|check| check.name() == s)
            .ok_or_else(|| E2eError::UnknownCheck(s.to_string()))
    }
}

async fn check_title<P: Page + ?Sized>(page: &P) -> E2eResult<CheckOutcome> {
    let title = page.title().await?;
    if title.is_empty() {
        return Err(E2eError::AssertionFailed("Title is empty".to_string()));
    }
    debug!("Title: {}", title);
    Ok(CheckOutcome::Verified)
}

async fn check_grade<P: Page + ?Sized>(page: &P, wait: &WaitConfig) -> E2eResult<CheckOutcome> {
    let grade = wait_visible(page, &Locator::xpath(GRADE_XPATH), wait).await?;
    if !page.is_displayed(grade).await? {
        return Err(E2eError::AssertionFailed("Grade element is not visible".to_string()));
    }

    let value = parse::parse_grade(&page.text(grade).await?)?;
    if value <= 0.0 || value.is_nan() {
        return Err(E2eError::AssertionFailed(format!(
            "Grade value {} is not greater than zero",
            value
        )));
    }
    debug!("Grade: {}", value);
    Ok(CheckOutcome::Verified)
}

async fn check_grade_explanation<P: Page + ?Sized>(page: &P, wait: &WaitConfig) -> E2eResult<CheckOutcome> {
    let link = wait_visible(page, &Locator::link_text(GRADE_LINK_TEXT), wait).await?;
    page.click(link).await?;

    let modal = wait_visible(page, &Locator::css(MODAL_CSS), wait).await?;
    if !page.is_displayed(modal).await? {
        return Err(E2eError::AssertionFailed("Grade explanation modal is not visible".to_string()));
    }

    let text = page.text(modal).await?;
    if !parse::contains_passage(&text, GRADE_SCALE_PASSAGE) {
        return Err(E2eError::AssertionFailed(
            "Grade scale passage not found in the modal".to_string(),
        ));
    }
    Ok(CheckOutcome::Verified)
}

async fn check_two_star_filter<P: Page + ?Sized>(page: &P, wait: &WaitConfig) -> E2eResult<CheckOutcome> {
    let filters = wait_present(page, &Locator::xpath(TWO_STAR_FILTER_XPATH), wait).await?;
    let Some(&filter) = filters.first() else {
        info!("No review with 2 stars exists, nothing to check");
        return Ok(CheckOutcome::NothingToCheck(
            "no 2-star filter on the page".to_string(),
        ));
    };

    page.click(filter).await?;
    let reviews = wait_all_visible(page, &Locator::xpath(REVIEW_BLOCK_XPATH), wait).await?;
    let star = Locator::xpath(HIGHLIGHTED_STAR_XPATH);

    for (index, &review) in reviews.iter().enumerate() {
        let stars = page.find_all_in(review, &star).await?.len();
        if stars != EXPECTED_STARS {
            return Err(E2eError::AssertionFailed(format!(
                "Review {} shows {} stars, expected {}",
                index + 1,
                stars,
                EXPECTED_STARS
            )));
        }
    }
    debug!("{} filtered reviews show {} stars", reviews.len(), EXPECTED_STARS);
    Ok(CheckOutcome::Verified)
}

async fn check_star_percentages<P: Page + ?Sized>(page: &P, wait: &WaitConfig) -> E2eResult<CheckOutcome> {
    let buckets = require_present(page, &Locator::xpath(STAR_PERCENT_XPATH), wait).await?;

    let mut texts = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        texts.push(page.text(bucket).await?);
    }

    let sum = parse::sum_percentages(&texts)?;
    if sum > MAX_PERCENT_SUM {
        return Err(E2eError::AssertionFailed(format!(
            "Sum of star percentages ({}) exceeds {}",
            sum, MAX_PERCENT_SUM
        )));
    }
    debug!("Star percentages {:?} sum to {}", texts, sum);
    Ok(CheckOutcome::Verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeElement, FakePage};
    use std::time::Duration;

    fn quick() -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn review_with_stars(count: usize) -> FakeElement {
        (0..count).fold(FakeElement::new("review"), |review, _| {
            review.child(Locator::xpath(HIGHLIGHTED_STAR_XPATH), FakeElement::new("★"))
        })
    }

    fn two_star_page(reviews: &[usize]) -> FakePage {
        let filter = reviews.iter().fold(FakeElement::new("2 Sterne"), |filter, &stars| {
            filter.reveals(Locator::xpath(REVIEW_BLOCK_XPATH), review_with_stars(stars))
        });
        FakePage::new("Shop").with(Locator::xpath(TWO_STAR_FILTER_XPATH), filter)
    }

    fn percent_page(values: &[&str]) -> FakePage {
        values.iter().fold(FakePage::new("Shop"), |page, value| {
            page.with(Locator::xpath(STAR_PERCENT_XPATH), FakeElement::new(value))
        })
    }

    #[test]
    fn test_check_names_round_trip() {
        for check in ReviewCheck::ALL {
            assert_eq!(check.name().parse::<ReviewCheck>().unwrap(), check);
        }
        assert!(matches!(
            "stars".parse::<ReviewCheck>(),
            Err(E2eError::UnknownCheck(_))
        ));
    }

    #[tokio::test]
    async fn test_title() {
        let outcome = ReviewCheck::Title.run(&FakePage::new("Bewertungen"), &quick()).await.unwrap();
        assert_eq!(outcome, CheckOutcome::Verified);

        let err = ReviewCheck::Title.run(&FakePage::new(""), &quick()).await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
    }

    #[tokio::test]
    async fn test_grade_accepts_positive_value() {
        let page = FakePage::new("Shop").with(Locator::xpath(GRADE_XPATH), FakeElement::new("4,50"));
        assert_eq!(
            ReviewCheck::GradeVisible.run(&page, &quick()).await.unwrap(),
            CheckOutcome::Verified
        );
    }

    #[tokio::test]
    async fn test_grade_rejects_zero() {
        let page = FakePage::new("Shop").with(Locator::xpath(GRADE_XPATH), FakeElement::new("0,00"));
        let err = ReviewCheck::GradeVisible.run(&page, &quick()).await.unwrap_err();
        assert!(err.to_string().contains("not greater than zero"), "got {err}");
    }

    #[tokio::test]
    async fn test_grade_rejects_unparseable_text() {
        let page = FakePage::new("Shop").with(Locator::xpath(GRADE_XPATH), FakeElement::new("k. A."));
        let err = ReviewCheck::GradeVisible.run(&page, &quick()).await.unwrap_err();
        assert!(matches!(err, E2eError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_grade_missing_times_out() {
        let err = ReviewCheck::GradeVisible
            .run(&FakePage::new("Shop"), &quick())
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_grade_explanation_opens_modal() {
        let modal_text = "Wie berechnet sich die Note?\n\
            Notenberechnung auf Basis der Sternevergabe\n\
            5.00 - 4.50\tSehr gut\n4.49 - 3.50\tGut\n3.49 - 2.50\tBefriedigend\n\
            2.49 - 1.50\tAusreichend\n1.49 - 1.00\tMangelhaft\nSchließen";
        let link = FakeElement::new(GRADE_LINK_TEXT)
            .reveals(Locator::css(MODAL_CSS), FakeElement::new(modal_text));
        let page = FakePage::new("Shop").with(Locator::link_text(GRADE_LINK_TEXT), link);

        let outcome = ReviewCheck::GradeExplanation.run(&page, &quick()).await.unwrap();
        assert_eq!(outcome, CheckOutcome::Verified);

        let link = page.find_all(&Locator::link_text(GRADE_LINK_TEXT)).await.unwrap()[0];
        assert_eq!(page.clicks(link), 1);
    }

    #[tokio::test]
    async fn test_grade_explanation_rejects_wrong_text() {
        let link = FakeElement::new(GRADE_LINK_TEXT)
            .reveals(Locator::css(MODAL_CSS), FakeElement::new("Notenberechnung folgt"));
        let page = FakePage::new("Shop").with(Locator::link_text(GRADE_LINK_TEXT), link);

        let err = ReviewCheck::GradeExplanation.run(&page, &quick()).await.unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(_)));
    }

    #[tokio::test]
    async fn test_grade_explanation_without_modal_times_out() {
        let page = FakePage::new("Shop")
            .with(Locator::link_text(GRADE_LINK_TEXT), FakeElement::new(GRADE_LINK_TEXT));

        let err = ReviewCheck::GradeExplanation.run(&page, &quick()).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_two_star_filter_all_reviews_match() {
        let page = two_star_page(&[2, 2, 2]);
        assert_eq!(
            ReviewCheck::TwoStarFilter.run(&page, &quick()).await.unwrap(),
            CheckOutcome::Verified
        );
    }

    #[tokio::test]
    async fn test_two_star_filter_rejects_wrong_counts() {
        for stars in [0, 1, 3] {
            let page = two_star_page(&[2, stars]);
            let err = ReviewCheck::TwoStarFilter.run(&page, &quick()).await.unwrap_err();
            assert!(
                err.to_string().contains(&format!("Review 2 shows {} stars", stars)),
                "got {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_two_star_filter_absent_is_tolerated() {
        let outcome = ReviewCheck::TwoStarFilter
            .run(&FakePage::new("Shop"), &quick())
            .await
            .unwrap();
        assert!(matches!(outcome, CheckOutcome::NothingToCheck(_)));
    }

    #[tokio::test]
    async fn test_two_star_filter_without_reviews_times_out() {
        let page = FakePage::new("Shop")
            .with(Locator::xpath(TWO_STAR_FILTER_XPATH), FakeElement::new("2 Sterne"));
        let err = ReviewCheck::TwoStarFilter.run(&page, &quick()).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_star_percentages_within_bound() {
        let page = percent_page(&["20", "30", "25", "15", "5"]);
        assert_eq!(
            ReviewCheck::StarPercentages.run(&page, &quick()).await.unwrap(),
            CheckOutcome::Verified
        );

        let page = percent_page(&["95", "2", "1", "<1", "<1"]);
        assert!(ReviewCheck::StarPercentages.run(&page, &quick()).await.is_ok());
    }

    #[tokio::test]
    async fn test_star_percentages_over_bound() {
        let page = percent_page(&["60", "30", "10", "1", "0"]);
        let err = ReviewCheck::StarPercentages.run(&page, &quick()).await.unwrap_err();
        assert!(err.to_string().contains("(101)"), "got {err}");
    }

    #[tokio::test]
    async fn test_star_percentages_unparseable() {
        let page = percent_page(&["60", "n/a"]);
        let err = ReviewCheck::StarPercentages.run(&page, &quick()).await.unwrap_err();
        assert!(matches!(err, E2eError::Parse { what: "percentage", .. }));
    }
}
