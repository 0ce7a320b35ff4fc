pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Bounded undo/redo stacks of content snapshots
#[derive(Debug, Clone)]
pub struct UndoHistory<T> {
    undo: Vec<T>,
    redo: Vec<T>,
    limit: usize,
}

impl<T> UndoHistory<T> {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// A limit of 0 disables undo entirely
    pub fn with_limit(limit: usize) -> Self {
        UndoHistory {
            undo: Vec::new(),
            redo: Vec::new(),
            limit,
        }
    }

    /// Record the state before an edit
    /// This clears any redo history
    pub fn record(&mut self, snapshot: T) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }

        self.undo.push(snapshot);

        // Drop the oldest entries once over the limit
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
    }

    /// Step back: returns the state to restore, keeping `current` for redo
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Step forward again after an undo
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Forget everything, e.g. after the content was replaced wholesale
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
}

impl<T> Default for UndoHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}
