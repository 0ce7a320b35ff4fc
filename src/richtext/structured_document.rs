// Structured Document Model
// Blog content as an ordered list of blocks holding styled inline runs.
// HTML is only the storage/transport format (see html_converter).
//
// Offsets are byte offsets into a block's plain-text projection. A hard break
// occupies one byte ("\n"). Offsets that fall inside a UTF-8 sequence are
// moved back to the previous character boundary.

use std::cmp::min;
use std::fmt;

/// Unique identifier for document elements
pub type ElementId = usize;

/// Text styling (semantic, not syntactic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub highlight: bool,
    /// CSS colour value, e.g. `#e11d48`
    pub color: Option<String>,
}

/// The on/off marks a toolbar button can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleFlag {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Highlight,
}

impl TextStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn bold() -> Self {
        TextStyle {
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        TextStyle {
            italic: true,
            ..Default::default()
        }
    }

    pub fn code() -> Self {
        TextStyle {
            code: true,
            ..Default::default()
        }
    }

    pub fn has(&self, flag: StyleFlag) -> bool {
        match flag {
            StyleFlag::Bold => self.bold,
            StyleFlag::Italic => self.italic,
            StyleFlag::Underline => self.underline,
            StyleFlag::Strikethrough => self.strikethrough,
            StyleFlag::Code => self.code,
            StyleFlag::Highlight => self.highlight,
        }
    }

    pub fn set(&mut self, flag: StyleFlag, on: bool) {
        match flag {
            StyleFlag::Bold => self.bold = on,
            StyleFlag::Italic => self.italic = on,
            StyleFlag::Underline => self.underline = on,
            StyleFlag::Strikethrough => self.strikethrough = on,
            StyleFlag::Code => self.code = on,
            StyleFlag::Highlight => self.highlight = on,
        }
    }
}

/// Largest char boundary in `text` that is `<= index`.
pub(crate) fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut index = index;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// A run of styled text (a contiguous piece of text with uniform styling)
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        TextRun {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::plain())
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Split this text run at the given byte offset
    /// Returns (left_run, right_run)
    pub fn split_at(&self, offset: usize) -> (TextRun, TextRun) {
        let offset = floor_char_boundary(&self.text, offset);
        let (left, right) = self.text.split_at(offset);
        (
            TextRun::new(left, self.style.clone()),
            TextRun::new(right, self.style.clone()),
        )
    }
}

/// Link target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    /// Browsing context, `_blank` for links inserted from the toolbar
    pub target: Option<String>,
    pub title: Option<String>,
}

impl Link {
    /// A link that opens in a new tab, as the editor toolbar inserts them.
    pub fn new(href: impl Into<String>) -> Self {
        Link {
            href: href.into(),
            target: Some("_blank".to_string()),
            title: None,
        }
    }
}

/// Inline content (can appear within a block)
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Text(TextRun),
    Link {
        link: Link,
        content: Vec<InlineContent>,
    },
    HardBreak,
}

impl InlineContent {
    /// Get the plain text length of this inline content
    pub fn text_len(&self) -> usize {
        match self {
            InlineContent::Text(run) => run.len(),
            InlineContent::Link { content, .. } => content.iter().map(|c| c.text_len()).sum(),
            InlineContent::HardBreak => 1,
        }
    }

    /// Flatten to plain text
    pub fn to_plain_text(&self) -> String {
        match self {
            InlineContent::Text(run) => run.text.clone(),
            InlineContent::Link { content, .. } => {
                content.iter().map(|c| c.to_plain_text()).collect()
            }
            InlineContent::HardBreak => "\n".to_string(),
        }
    }

    fn for_each_run_mut(&mut self, f: &mut dyn FnMut(&mut TextRun)) {
        match self {
            InlineContent::Text(run) => f(run),
            InlineContent::Link { content, .. } => {
                for item in content.iter_mut() {
                    item.for_each_run_mut(f);
                }
            }
            InlineContent::HardBreak => {}
        }
    }
}

/// Push `item` onto `content`, merging it into the previous run when the styles match.
pub(crate) fn push_merged(content: &mut Vec<InlineContent>, item: InlineContent) {
    match item {
        InlineContent::Text(run) if run.is_empty() => {}
        InlineContent::Text(run) => {
            if let Some(InlineContent::Text(last)) = content.last_mut()
                && last.style == run.style
            {
                last.text.push_str(&run.text);
                return;
            }
            content.push(InlineContent::Text(run));
        }
        InlineContent::Link { link, content: inner } => {
            let inner = normalized(inner);
            if inner.is_empty() {
                return;
            }
            if let Some(InlineContent::Link {
                link: last_link,
                content: last_inner,
            }) = content.last_mut()
                && *last_link == link
            {
                for child in inner {
                    push_merged(last_inner, child);
                }
                return;
            }
            content.push(InlineContent::Link {
                link,
                content: inner,
            });
        }
        InlineContent::HardBreak => content.push(InlineContent::HardBreak),
    }
}

fn normalized(content: Vec<InlineContent>) -> Vec<InlineContent> {
    let mut out = Vec::with_capacity(content.len());
    for item in content {
        push_merged(&mut out, item);
    }
    out
}

/// Horizontal alignment of paragraphs and headings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// Block-level content types
#[derive(Debug, Clone, PartialEq)]
pub enum BlockType {
    Paragraph,
    Heading {
        level: u8,
    }, // 1-6
    CodeBlock {
        language: Option<String>,
    },
    BlockQuote,
    ListItem {
        ordered: bool,
    },
    Image {
        src: String,
        alt: Option<String>,
        width: Option<u32>,
    },
    HorizontalRule,
}

impl BlockType {
    /// Whether blocks of this type carry inline content at all
    pub fn holds_text(&self) -> bool {
        !matches!(self, BlockType::Image { .. } | BlockType::HorizontalRule)
    }

    pub fn supports_align(&self) -> bool {
        matches!(self, BlockType::Paragraph | BlockType::Heading { .. })
    }
}

/// A block of content
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: ElementId,
    pub block_type: BlockType,
    pub align: Option<TextAlign>,
    pub content: Vec<InlineContent>,
}

impl Block {
    pub fn new(id: ElementId, block_type: BlockType) -> Self {
        Block {
            id,
            block_type,
            align: None,
            content: Vec::new(),
        }
    }

    pub fn paragraph(id: ElementId) -> Self {
        Self::new(id, BlockType::Paragraph)
    }

    pub fn heading(id: ElementId, level: u8) -> Self {
        Self::new(
            id,
            BlockType::Heading {
                level: level.clamp(1, 6),
            },
        )
    }

    pub fn list_item(id: ElementId, ordered: bool) -> Self {
        Self::new(id, BlockType::ListItem { ordered })
    }

    pub fn image(id: ElementId, src: impl Into<String>) -> Self {
        Self::new(
            id,
            BlockType::Image {
                src: src.into(),
                alt: None,
                width: None,
            },
        )
    }

    pub fn with_text(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        push_merged(
            &mut self.content,
            InlineContent::Text(TextRun::new(text, style)),
        );
        self
    }

    pub fn with_plain_text(self, text: impl Into<String>) -> Self {
        self.with_text(text, TextStyle::plain())
    }

    pub fn with_link(mut self, link: Link, text: impl Into<String>) -> Self {
        push_merged(
            &mut self.content,
            InlineContent::Link {
                link,
                content: vec![InlineContent::Text(TextRun::plain(text))],
            },
        );
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = Some(align);
        self
    }

    /// Get the total text length of this block
    pub fn text_len(&self) -> usize {
        self.content.iter().map(|c| c.text_len()).sum()
    }

    /// Get plain text content
    pub fn to_plain_text(&self) -> String {
        self.content.iter().map(|c| c.to_plain_text()).collect()
    }

    /// Check if this block is empty (no visible text)
    pub fn is_empty(&self) -> bool {
        self.block_type.holds_text()
            && self.content.iter().all(|c| match c {
                InlineContent::Text(run) => run.text.trim().is_empty(),
                InlineContent::Link { content, .. } => {
                    content.iter().all(|c| c.to_plain_text().trim().is_empty())
                }
                InlineContent::HardBreak => true,
            })
    }

    /// Append inline content, merging adjacent runs with identical styling
    pub fn push_inline(&mut self, item: InlineContent) {
        push_merged(&mut self.content, item);
    }

    /// Merge adjacent runs and drop empty ones
    pub fn normalize(&mut self) {
        let content = std::mem::take(&mut self.content);
        self.content = normalized(content);
    }

    /// Visit every text run, including runs nested inside links
    pub fn for_each_text_run_mut(&mut self, mut f: impl FnMut(&mut TextRun)) {
        for item in self.content.iter_mut() {
            item.for_each_run_mut(&mut f);
        }
    }

    /// Delete text in [start..end) within this block's flattened content
    pub fn delete_text_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let tail = self.split_content_at(end);
        let _removed = self.split_content_at(start);
        self.content.extend(tail);
        self.normalize();
    }

    /// Split this block's content at a flattened text offset, returning the right part.
    /// The left part remains in self.
    pub fn split_content_at(&mut self, offset: usize) -> Vec<InlineContent> {
        fn split_vec(
            content: &[InlineContent],
            offset: usize,
        ) -> (Vec<InlineContent>, Vec<InlineContent>) {
            let mut left: Vec<InlineContent> = Vec::new();
            let mut right: Vec<InlineContent> = Vec::new();
            let mut pos = 0usize;
            let mut done = false;

            for item in content.iter() {
                if done {
                    right.push(item.clone());
                    continue;
                }
                let len = item.text_len();
                if pos + len <= offset {
                    left.push(item.clone());
                    pos += len;
                    done = pos == offset;
                    continue;
                }
                // offset falls within this item
                let local = offset - pos;
                match item {
                    InlineContent::Text(run) => {
                        let (l, r) = run.split_at(local);
                        if !l.is_empty() {
                            left.push(InlineContent::Text(l));
                        }
                        if !r.is_empty() {
                            right.push(InlineContent::Text(r));
                        }
                    }
                    InlineContent::Link {
                        link,
                        content: inner,
                    } => {
                        let (l_inner, r_inner) = split_vec(inner, local);
                        if !l_inner.is_empty() {
                            left.push(InlineContent::Link {
                                link: link.clone(),
                                content: l_inner,
                            });
                        }
                        if !r_inner.is_empty() {
                            right.push(InlineContent::Link {
                                link: link.clone(),
                                content: r_inner,
                            });
                        }
                    }
                    InlineContent::HardBreak => {
                        // local is 0 here, the break belongs to the right side
                        right.push(item.clone());
                    }
                }
                done = true;
            }

            (left, right)
        }

        let offset = self.clamp_offset(offset);
        let (left, right) = split_vec(&self.content, offset);
        self.content = left;
        right
    }

    /// Clamp an offset to the block's text and to a character boundary
    pub fn clamp_offset(&self, offset: usize) -> usize {
        floor_char_boundary(&self.to_plain_text(), min(offset, self.text_len()))
    }

    /// Insert plain text at a flattened text offset.
    /// The inserted text takes the style of the run it lands in (or follows).
    pub fn insert_plain_text(&mut self, offset: usize, text: &str) {
        let right = self.split_content_at(offset);
        if !text.is_empty() {
            let style = match self.content.last() {
                Some(InlineContent::Text(run)) => run.style.clone(),
                _ => TextStyle::plain(),
            };
            self.content
                .push(InlineContent::Text(TextRun::new(text, style)));
        }
        self.content.extend(right);
        self.normalize();
    }

    /// Run `update` over the style of every run overlapping [start..end)
    pub fn apply_style(&mut self, start: usize, end: usize, update: impl Fn(&mut TextStyle)) {
        if start >= end {
            return;
        }
        let tail = self.split_content_at(end);
        let mut middle = self.split_content_at(start);
        for item in middle.iter_mut() {
            item.for_each_run_mut(&mut |run: &mut TextRun| update(&mut run.style));
        }
        self.content.extend(middle);
        self.content.extend(tail);
        self.normalize();
    }

    /// True when every run overlapping [start..end) carries `flag`
    pub fn range_has_style(&self, start: usize, end: usize, flag: StyleFlag) -> bool {
        fn collect<'a>(
            content: &'a [InlineContent],
            base: usize,
            out: &mut Vec<(usize, &'a TextRun)>,
        ) {
            let mut pos = base;
            for item in content {
                match item {
                    InlineContent::Text(run) => out.push((pos, run)),
                    InlineContent::Link { content, .. } => collect(content, pos, out),
                    InlineContent::HardBreak => {}
                }
                pos += item.text_len();
            }
        }

        let mut runs = Vec::new();
        collect(&self.content, 0, &mut runs);
        let mut overlapping = runs
            .into_iter()
            .filter(|(pos, run)| *pos < end && pos + run.len() > start)
            .peekable();
        overlapping.peek().is_some() && overlapping.all(|(_, run)| run.style.has(flag))
    }

    /// Wrap [start..end) in `link`, or unwrap any links there when `link` is None
    pub fn set_link(&mut self, start: usize, end: usize, link: Option<Link>) {
        fn unwrap_links(content: Vec<InlineContent>, out: &mut Vec<InlineContent>) {
            for item in content {
                match item {
                    InlineContent::Link { content, .. } => unwrap_links(content, out),
                    other => out.push(other),
                }
            }
        }

        if start >= end {
            return;
        }
        let tail = self.split_content_at(end);
        let middle = self.split_content_at(start);
        let mut plain = Vec::new();
        unwrap_links(middle, &mut plain);
        match link {
            Some(link) => self.content.push(InlineContent::Link {
                link,
                content: plain,
            }),
            None => self.content.extend(plain),
        }
        self.content.extend(tail);
        self.normalize();
    }
}

/// Position within a document
/// This represents a logical cursor position in the structured content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentPosition {
    pub block_index: usize,
    pub offset: usize, // Byte offset within the block's flattened text
}

impl DocumentPosition {
    pub fn new(block_index: usize, offset: usize) -> Self {
        DocumentPosition {
            block_index,
            offset,
        }
    }

    pub fn start() -> Self {
        DocumentPosition::new(0, 0)
    }
}

/// The structured document
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredDocument {
    blocks: Vec<Block>,
    next_id: ElementId,
}

impl StructuredDocument {
    pub fn new() -> Self {
        StructuredDocument {
            blocks: Vec::new(),
            next_id: 1,
        }
    }

    /// Get a unique element ID
    fn next_id(&mut self) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Get blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get mutable blocks
    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    /// Add a block
    pub fn add_block(&mut self, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        self.blocks.push(block);
    }

    /// Insert a block at a specific position (clamped to the end)
    pub fn insert_block(&mut self, index: usize, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        let index = min(index, self.blocks.len());
        self.blocks.insert(index, block);
    }

    /// Remove a block
    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        if index < self.blocks.len() {
            Some(self.blocks.remove(index))
        } else {
            None
        }
    }

    /// Get block count
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Find block by ID
    pub fn find_block(&self, id: ElementId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Find block index by ID
    pub fn find_block_index(&self, id: ElementId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Validate and clamp a position to document bounds
    pub fn clamp_position(&self, pos: DocumentPosition) -> DocumentPosition {
        if self.blocks.is_empty() {
            return DocumentPosition::start();
        }

        let block_index = pos.block_index.min(self.blocks.len() - 1);
        let offset = self.blocks[block_index].clamp_offset(pos.offset);

        DocumentPosition::new(block_index, offset)
    }

    /// Plain-text projection: block texts joined by blank lines
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.to_plain_text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Check if document is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Create a simple document with one paragraph
    pub fn with_paragraph(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.add_block(Block::paragraph(0).with_plain_text(text));
        doc
    }

    /// Delete content in [start..end) across blocks.
    /// If the range spans multiple blocks, merges the tail of the end block into the start block
    /// and removes all fully-covered blocks in between.
    pub fn delete_range(&mut self, start: DocumentPosition, end: DocumentPosition) {
        if self.blocks.is_empty() {
            return;
        }
        let (a, b) = self.ordered(start, end);

        if a.block_index == b.block_index {
            self.blocks[a.block_index].delete_text_range(a.offset, b.offset);
            return;
        }

        // Delete tail of start block
        {
            let block = &mut self.blocks[a.block_index];
            let len = block.text_len();
            block.delete_text_range(a.offset, len);
        }

        // Keep what follows the end position; the rest of the end block goes away
        let tail_content = self.blocks[b.block_index].split_content_at(b.offset);
        self.blocks.drain(a.block_index + 1..=b.block_index);

        let target = &mut self.blocks[a.block_index];
        target.content.extend(tail_content);
        target.normalize();
    }

    /// Replace content in [start..end) with plain text. Supports multi-paragraph text using \n\n separators.
    /// If the replacement spans multiple paragraphs, any tail content from the original end
    /// position is appended to the last inserted paragraph block.
    pub fn replace_range(&mut self, start: DocumentPosition, end: DocumentPosition, text: &str) {
        if self.blocks.is_empty() {
            let id = self.next_id();
            self.blocks.push(Block::paragraph(id));
        }

        let (start_pos, end_pos) = self.ordered(start, end);
        self.delete_range(start_pos, end_pos);

        if text.is_empty() {
            return;
        }

        let insert_block_index = start_pos
            .block_index
            .min(self.blocks.len().saturating_sub(1));
        let insert_offset = self.blocks[insert_block_index].clamp_offset(start_pos.offset);

        let paragraphs: Vec<&str> = text.split("\n\n").collect();
        if paragraphs.len() == 1 {
            self.blocks[insert_block_index].insert_plain_text(insert_offset, text);
            return;
        }

        // Content after the insertion point ends up after the LAST inserted paragraph
        let trailing_right = self.blocks[insert_block_index].split_content_at(insert_offset);
        self.blocks[insert_block_index].insert_plain_text(insert_offset, paragraphs[0]);

        let mut last_block_index = insert_block_index;
        for p in paragraphs.iter().skip(1) {
            let block = Block::paragraph(0).with_plain_text(*p);
            last_block_index += 1;
            self.insert_block(last_block_index, block);
        }

        let last = &mut self.blocks[last_block_index];
        last.content.extend(trailing_right);
        last.normalize();
    }

    /// Insert plain text at a position
    pub fn insert_text(&mut self, at: DocumentPosition, text: &str) {
        self.replace_range(at, at, text);
    }

    fn ordered(
        &self,
        start: DocumentPosition,
        end: DocumentPosition,
    ) -> (DocumentPosition, DocumentPosition) {
        let a = self.clamp_position(start);
        let b = self.clamp_position(end);
        if (b.block_index, b.offset) < (a.block_index, a.offset) {
            (b, a)
        } else {
            (a, b)
        }
    }
}

impl Default for StructuredDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StructuredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StructuredDocument ({} blocks):", self.blocks.len())?;
        for (i, block) in self.blocks.iter().enumerate() {
            write!(f, "  [{}] ", i)?;
            match &block.block_type {
                BlockType::Paragraph => write!(f, "Paragraph")?,
                BlockType::Heading { level } => write!(f, "Heading(h{})", level)?,
                BlockType::CodeBlock { language } => write!(f, "CodeBlock({:?})", language)?,
                BlockType::BlockQuote => write!(f, "BlockQuote")?,
                BlockType::ListItem { ordered } => write!(
                    f,
                    "ListItem({})",
                    if *ordered { "ordered" } else { "bullet" }
                )?,
                BlockType::Image { src, .. } => write!(f, "Image({})", src)?,
                BlockType::HorizontalRule => write!(f, "HorizontalRule")?,
            }
            if let Some(align) = block.align {
                write!(f, " align={}", align.as_str())?;
            }
            writeln!(f, ": {:?}", block.to_plain_text())?;
        }
        Ok(())
    }
}
