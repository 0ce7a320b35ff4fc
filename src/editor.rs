//! The blog editor: a document with undo history, the search panel and the
//! keymap that drives both.

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::UndoHistory;
use crate::keybinds::{EditorAction, KeyEvent, KeyOutcome, Keymap};
use crate::richtext::html_converter::{document_to_html, html_to_document};
use crate::richtext::structured_document::{
    Block, BlockType, DocumentPosition, Link, StructuredDocument, StyleFlag, TextAlign,
};
use crate::search::{EditingSurface, ReplaceOutcome};
use crate::search_panel::SearchPanel;

/// A single user edit. Offsets are byte offsets into a block's plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    InsertText {
        at: DocumentPosition,
        text: String,
    },
    DeleteRange {
        start: DocumentPosition,
        end: DocumentPosition,
    },
    ReplaceRange {
        start: DocumentPosition,
        end: DocumentPosition,
        text: String,
    },
    SetBlockType {
        block: usize,
        block_type: BlockType,
    },
    SetAlign {
        block: usize,
        align: Option<TextAlign>,
    },
    /// Turns `flag` on over the range, or off when the whole range has it
    ToggleStyle {
        block: usize,
        start: usize,
        end: usize,
        flag: StyleFlag,
    },
    SetColor {
        block: usize,
        start: usize,
        end: usize,
        color: Option<String>,
    },
    /// `None` removes links in the range
    SetLink {
        block: usize,
        start: usize,
        end: usize,
        link: Option<Link>,
    },
    InsertImage {
        index: usize,
        src: String,
        alt: Option<String>,
        width: Option<u32>,
    },
}

/// Document plus undo history; what the search engine edits
#[derive(Debug, Clone)]
pub struct EditorContent {
    document: StructuredDocument,
    history: UndoHistory<StructuredDocument>,
}

impl EditorContent {
    pub fn new(history_limit: usize) -> Self {
        Self::with_document(StructuredDocument::with_paragraph(""), history_limit)
    }

    pub fn with_document(document: StructuredDocument, history_limit: usize) -> Self {
        EditorContent {
            document,
            history: UndoHistory::with_limit(history_limit),
        }
    }

    pub fn from_html(html: &str, history_limit: usize) -> Self {
        Self::with_document(html_to_document(html), history_limit)
    }

    pub fn document(&self) -> &StructuredDocument {
        &self.document
    }

    /// Apply an edit, recording the previous state for undo.
    /// Edits that change nothing leave the history alone.
    pub fn apply(&mut self, command: EditCommand) -> Result<()> {
        let before = self.document.clone();
        apply_command(&mut self.document, command)?;
        if self.document != before {
            self.history.record(before);
        }
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let current = self.document.clone();
        match self.history.undo(current) {
            Some(previous) => {
                self.document = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.document.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.document = next;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

impl EditingSurface for EditorContent {
    fn plain_text(&self) -> String {
        self.document.to_plain_text()
    }

    fn markup(&self) -> String {
        document_to_html(&self.document)
    }

    /// Wholesale replacement: earlier states can no longer be undone to
    fn set_markup(&mut self, markup: &str) {
        self.document = html_to_document(markup);
        self.history.clear();
    }
}

fn block_mut(document: &mut StructuredDocument, index: usize) -> Result<&mut Block> {
    document
        .blocks_mut()
        .get_mut(index)
        .ok_or(Error::InvalidBlock(index))
}

fn apply_command(document: &mut StructuredDocument, command: EditCommand) -> Result<()> {
    match command {
        EditCommand::InsertText { at, text } => document.insert_text(at, &text),
        EditCommand::DeleteRange { start, end } => document.delete_range(start, end),
        EditCommand::ReplaceRange { start, end, text } => document.replace_range(start, end, &text),
        EditCommand::SetBlockType { block, block_type } => {
            if !block_type.holds_text() {
                return Err(Error::Validation(
                    "images and rules are inserted, not converted to".to_string(),
                ));
            }
            let block = block_mut(document, block)?;
            if !block.block_type.holds_text() {
                return Err(Error::Validation(
                    "only text blocks can change type".to_string(),
                ));
            }
            block.block_type = block_type;
            if !block.block_type.supports_align() {
                block.align = None;
            }
        }
        EditCommand::SetAlign { block, align } => {
            let block = block_mut(document, block)?;
            if block.block_type.supports_align() {
                block.align = align;
            }
        }
        EditCommand::ToggleStyle {
            block,
            start,
            end,
            flag,
        } => {
            let block = block_mut(document, block)?;
            let on = !block.range_has_style(start, end, flag);
            block.apply_style(start, end, |style| style.set(flag, on));
        }
        EditCommand::SetColor {
            block,
            start,
            end,
            color,
        } => {
            let block = block_mut(document, block)?;
            block.apply_style(start, end, |style| style.color = color.clone());
        }
        EditCommand::SetLink {
            block,
            start,
            end,
            link,
        } => block_mut(document, block)?.set_link(start, end, link),
        EditCommand::InsertImage {
            index,
            src,
            alt,
            width,
        } => {
            let image = Block::new(0, BlockType::Image { src, alt, width });
            document.insert_block(index, image);
        }
    }
    Ok(())
}

/// The editing view: content, search panel and shortcuts
pub struct Editor {
    content: EditorContent,
    search: SearchPanel,
    keymap: Keymap,
}

impl Editor {
    pub fn new(content: EditorContent, search: SearchPanel, keymap: Keymap) -> Self {
        Editor {
            content,
            search,
            keymap,
        }
    }

    /// Editor over `html`, set up from the user's configuration
    pub fn from_config(html: &str, config: &Config) -> Result<Self> {
        Ok(Self::new(
            EditorContent::from_html(html, config.editor.history_limit),
            SearchPanel::new(config.search.strategy),
            config.keymap()?,
        ))
    }

    pub fn content(&self) -> &EditorContent {
        &self.content
    }

    pub fn search(&self) -> &SearchPanel {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut SearchPanel {
        &mut self.search
    }

    /// Offer a key press to the editor. When it is handled the host must
    /// suppress its own behaviour, notably the browser's find dialog.
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        let Some(action) = self.keymap.resolve(event) else {
            return KeyOutcome::ignored();
        };

        match action {
            EditorAction::ToggleSearch => self.toggle_search(),
            EditorAction::CloseSearch => {
                if !self.search.is_open() {
                    return KeyOutcome::ignored();
                }
                self.close_search();
            }
            EditorAction::Undo => {
                self.undo();
            }
            EditorAction::Redo => {
                self.redo();
            }
        }
        KeyOutcome::handled(action)
    }

    pub fn toggle_search(&mut self) {
        self.search.toggle();
    }

    pub fn close_search(&mut self) {
        self.search.close();
    }

    pub fn set_query(&mut self, query: &str) {
        self.search.set_query(query, &self.content);
    }

    pub fn set_replacement(&mut self, replacement: &str) {
        self.search.set_replacement(replacement);
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    pub fn replace_all(&mut self) -> Result<Option<ReplaceOutcome>> {
        self.search.replace_all(&mut self.content)
    }

    pub fn match_count(&self) -> usize {
        self.search.match_count()
    }

    pub fn html(&self) -> String {
        self.content.markup()
    }

    pub fn text(&self) -> String {
        self.content.plain_text()
    }

    /// Load new content wholesale; history starts over
    pub fn set_content(&mut self, html: &str) {
        self.content.set_markup(html);
        self.search.refresh(&self.content);
    }

    pub fn apply(&mut self, command: EditCommand) -> Result<()> {
        debug!("Edit: {:?}", command);
        self.content.apply(command)?;
        self.search.refresh(&self.content);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.content.undo();
        if undone {
            self.search.refresh(&self.content);
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.content.redo();
        if redone {
            self.search.refresh(&self.content);
        }
        redone
    }
}
