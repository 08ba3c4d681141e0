//! In-memory [`Page`] for unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{ElementId, Page};

/// Blueprint of an element registered on a [`FakePage`]
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    hidden: bool,
    visible_after: usize,
    stale_for: usize,
    children: Vec<(Locator, FakeElement)>,
    reveals: Vec<(Locator, FakeElement)>,
}

impl FakeElement {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Report not displayed for the first `polls` visibility checks
    pub fn visible_after(mut self, polls: usize) -> Self {
        self.visible_after = polls;
        self
    }

    /// Fail the first `polls` visibility checks as detached
    pub fn stale_for(mut self, polls: usize) -> Self {
        self.stale_for = polls;
        self
    }

    pub fn child(mut self, locator: Locator, element: FakeElement) -> Self {
        self.children.push((locator, element));
        self
    }

    /// Add `element` to the page when this element is clicked
    pub fn reveals(mut self, locator: Locator, element: FakeElement) -> Self {
        self.reveals.push((locator, element));
        self
    }
}

#[derive(Debug)]
struct Node {
    blueprint: FakeElement,
    displayed_calls: usize,
    clicks: usize,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    index: HashMap<(Option<ElementId>, Locator), Vec<ElementId>>,
}

impl State {
    fn insert(&mut self, scope: Option<ElementId>, locator: Locator, element: FakeElement) {
        let id = ElementId(self.nodes.len() as u64);
        let children = element.children.clone();
        self.nodes.push(Node {
            blueprint: element,
            displayed_calls: 0,
            clicks: 0,
        });
        self.index.entry((scope, locator)).or_default().push(id);

        for (child_locator, child) in children {
            self.insert(Some(id), child_locator, child);
        }
    }

    fn node(&mut self, id: ElementId) -> E2eResult<&mut Node> {
        self.nodes.get_mut(id.0 as usize).ok_or(E2eError::StaleElement)
    }
}

pub struct FakePage {
    title: String,
    state: Mutex<State>,
}

impl FakePage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with(self, locator: Locator, element: FakeElement) -> Self {
        self.state.lock().unwrap().insert(None, locator, element);
        self
    }

    pub fn clicks(&self, element: ElementId) -> usize {
        self.state.lock().unwrap().nodes[element.0 as usize].clicks
    }
}

#[async_trait]
impl Page for FakePage {
    async fn title(&self) -> E2eResult<String> {
        Ok(self.title.clone())
    }

    async fn find_all(&self, locator: &Locator) -> E2eResult<Vec<ElementId>> {
        let state = self.state.lock().unwrap();
        Ok(state.index.get(&(None, locator.clone())).cloned().unwrap_or_default())
    }

    async fn find_all_in(&self, scope: ElementId, locator: &Locator) -> E2eResult<Vec<ElementId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .index
            .get(&(Some(scope), locator.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn text(&self, element: ElementId) -> E2eResult<String> {
        let mut state = self.state.lock().unwrap();
        Ok(state.node(element)?.blueprint.text.clone())
    }

    async fn is_displayed(&self, element: ElementId) -> E2eResult<bool> {
        let mut state = self.state.lock().unwrap();
        let node = state.node(element)?;
        node.displayed_calls += 1;

        if node.displayed_calls <= node.blueprint.stale_for {
            return Err(E2eError::StaleElement);
        }
        Ok(!node.blueprint.hidden && node.displayed_calls > node.blueprint.visible_after)
    }

    async fn click(&self, element: ElementId) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        let node = state.node(element)?;
        node.clicks += 1;
        let revealed = std::mem::take(&mut node.blueprint.reveals);

        for (locator, revealed_element) in revealed {
            state.insert(None, locator, revealed_element);
        }
        Ok(())
    }
}
