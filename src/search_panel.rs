//! The find/replace panel shown above the editor.

use log::debug;

use crate::error::Result;
use crate::search::{self, EditingSurface, ReplaceOutcome, ReplaceStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
}

/// Panel state. Query, replacement and count only exist while open;
/// closing throws them away.
#[derive(Debug, Clone, Default)]
pub struct SearchPanel {
    state: PanelState,
    query: String,
    replacement: String,
    match_count: usize,
    /// Set on opening so the host puts the cursor in the query field
    focus_query: bool,
    strategy: ReplaceStrategy,
    last_outcome: Option<ReplaceOutcome>,
}

impl SearchPanel {
    pub fn new(strategy: ReplaceStrategy) -> Self {
        SearchPanel {
            strategy,
            ..Default::default()
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PanelState::Open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    pub fn strategy(&self) -> ReplaceStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: ReplaceStrategy) {
        self.strategy = strategy;
    }

    /// Consume the focus request made by opening the panel
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_query)
    }

    /// Notice from the most recent replace-all, if any
    pub fn last_outcome(&self) -> Option<ReplaceOutcome> {
        self.last_outcome
    }

    /// Opening does not run a search by itself
    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        self.state = PanelState::Open;
        self.focus_query = true;
    }

    pub fn close(&mut self) {
        self.state = PanelState::Closed;
        self.reset();
        self.focus_query = false;
    }

    pub fn toggle(&mut self) {
        match self.state {
            PanelState::Closed => self.open(),
            PanelState::Open => self.close(),
        }
        debug!("Search panel {:?}", self.state);
    }

    pub fn set_query(&mut self, query: &str, surface: &dyn EditingSurface) {
        if !self.is_open() {
            return;
        }
        self.query = query.to_string();
        self.refresh(surface);
    }

    pub fn set_replacement(&mut self, replacement: &str) {
        if !self.is_open() {
            return;
        }
        self.replacement = replacement.to_string();
    }

    /// Empty both fields, keep the panel open
    pub fn clear(&mut self) {
        if !self.is_open() {
            return;
        }
        self.reset();
    }

    /// Recount after the document changed
    pub fn refresh(&mut self, surface: &dyn EditingSurface) {
        self.match_count = if self.is_open() {
            search::count_document_matches(surface, &self.query)
        } else {
            0
        };
    }

    /// Run replace-all with the panel's fields. `None` while closed.
    pub fn replace_all(&mut self, surface: &mut dyn EditingSurface) -> Result<Option<ReplaceOutcome>> {
        if !self.is_open() {
            return Ok(None);
        }
        let outcome = search::replace_all(surface, &self.query, &self.replacement, self.strategy)?;
        self.last_outcome = Some(outcome);
        self.refresh(surface);
        Ok(Some(outcome))
    }

    pub fn match_label(&self) -> String {
        format!("{} matches", self.match_count)
    }

    fn reset(&mut self) {
        self.query.clear();
        self.replacement.clear();
        self.match_count = 0;
        self.last_outcome = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlainSurface(String);

    impl EditingSurface for PlainSurface {
        fn plain_text(&self) -> String {
            self.0.clone()
        }

        fn markup(&self) -> String {
            self.0.clone()
        }

        fn set_markup(&mut self, markup: &str) {
            self.0 = markup.to_string();
        }
    }

    #[test]
    fn test_toggle_and_focus() {
        let mut panel = SearchPanel::default();
        assert_eq!(panel.state(), PanelState::Closed);

        panel.toggle();
        assert!(panel.is_open());
        assert!(panel.take_focus_request());
        assert!(!panel.take_focus_request());

        panel.toggle();
        assert_eq!(panel.state(), PanelState::Closed);
    }

    #[test]
    fn test_opening_does_not_search() {
        let surface = PlainSurface("fox fox".to_string());
        let mut panel = SearchPanel::default();
        panel.open();
        assert_eq!(panel.match_count(), 0);

        panel.set_query("fox", &surface);
        assert_eq!(panel.match_label(), "2 matches");
    }

    #[test]
    fn test_closing_resets_fields() {
        let surface = PlainSurface("fox".to_string());
        let mut panel = SearchPanel::default();
        panel.open();
        panel.set_query("fox", &surface);
        panel.set_replacement("cat");

        panel.close();
        panel.open();
        assert_eq!(panel.query(), "");
        assert_eq!(panel.replacement(), "");
        assert_eq!(panel.match_count(), 0);
    }

    #[test]
    fn test_input_ignored_while_closed() {
        let mut surface = PlainSurface("fox".to_string());
        let mut panel = SearchPanel::default();

        panel.set_query("fox", &surface);
        panel.set_replacement("cat");
        assert_eq!(panel.query(), "");
        assert_eq!(panel.replace_all(&mut surface).unwrap(), None);
        assert_eq!(surface.0, "fox");
    }

    #[test]
    fn test_replace_all_recounts() {
        let mut surface = PlainSurface("a fox and a fox".to_string());
        let mut panel = SearchPanel::default();
        panel.open();
        panel.set_query("fox", &surface);
        panel.set_replacement("cat");

        let outcome = panel.replace_all(&mut surface).unwrap();
        assert_eq!(outcome, Some(ReplaceOutcome::Replaced { count: 2 }));
        assert_eq!(surface.0, "a cat and a cat");
        assert_eq!(panel.match_count(), 0);
        assert_eq!(panel.last_outcome().map(|o| o.notice()), Some("Replaced successfully!"));

        panel.clear();
        assert_eq!(panel.query(), "");
        assert!(panel.is_open());
    }
}
