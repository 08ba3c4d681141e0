//! The page surface checks are written against

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::E2eResult;
use crate::locator::Locator;

/// Opaque handle to an element held by the browser side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A loaded page that can be queried and interacted with.
///
/// All methods are single non-blocking queries; waiting is layered on top in
/// [`crate::wait`].
#[async_trait]
pub trait Page: Send + Sync {
    /// Current `document.title`
    async fn title(&self) -> E2eResult<String>;

    /// All elements currently matching `locator`, in document order
    async fn find_all(&self, locator: &Locator) -> E2eResult<Vec<ElementId>>;

    /// All descendants of `scope` matching `locator`
    async fn find_all_in(&self, scope: ElementId, locator: &Locator) -> E2eResult<Vec<ElementId>>;

    /// Rendered text of an element (`innerText`)
    async fn text(&self, element: ElementId) -> E2eResult<String>;

    /// Whether the element is rendered and visible
    async fn is_displayed(&self, element: ElementId) -> E2eResult<bool>;

    async fn click(&self, element: ElementId) -> E2eResult<()>;
}
