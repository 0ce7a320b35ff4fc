// Markdown Converter
// Imports Markdown into a StructuredDocument. Markdown is an input format only;
// documents are always stored as HTML.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use super::structured_document::*;

/// Convert markdown text to a StructuredDocument
pub fn markdown_to_document(markdown: &str) -> StructuredDocument {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = MarkdownBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.feed(event);
    }
    builder.finish()
}

#[derive(Default)]
struct MarkdownBuilder {
    doc: StructuredDocument,
    current: Option<Block>,
    // Stack to track current text style (for nested emphasis/strong)
    style_stack: Vec<TextStyle>,
    link: Option<(Link, Vec<InlineContent>)>,
    // (src, alt text collected so far)
    image: Option<(String, String)>,
    lists: Vec<bool>,
    quote_depth: usize,
    in_code_block: bool,
}

impl MarkdownBuilder {
    fn feed(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag_end) => self.end(tag_end),
            Event::Text(text) => self.text(&text),
            Event::Code(text) => {
                let mut style = self.style();
                style.code = true;
                self.push_inline(InlineContent::Text(TextRun::new(text.to_string(), style)));
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.push_inline(InlineContent::HardBreak),
            Event::Rule => {
                self.finish_block();
                self.doc
                    .add_block(Block::new(0, BlockType::HorizontalRule));
            }
            Event::InlineHtml(html) => self.inline_html(&html),
            _ => {}
        }
    }

    fn finish(mut self) -> StructuredDocument {
        self.finish_block();
        // Ensure at least one block exists
        if self.doc.is_empty() {
            self.doc.add_block(Block::paragraph(0));
        }
        self.doc
    }

    fn style(&self) -> TextStyle {
        self.style_stack.last().cloned().unwrap_or_default()
    }

    fn push_style(&mut self, update: impl FnOnce(&mut TextStyle)) {
        let mut style = self.style();
        update(&mut style);
        self.style_stack.push(style);
    }

    fn context_block_type(&self) -> BlockType {
        if let Some(&ordered) = self.lists.last() {
            BlockType::ListItem { ordered }
        } else if self.quote_depth > 0 {
            BlockType::BlockQuote
        } else {
            BlockType::Paragraph
        }
    }

    fn start_block(&mut self, block_type: BlockType) {
        self.finish_block();
        self.current = Some(Block::new(0, block_type));
    }

    fn finish_block(&mut self) {
        if let Some((link, content)) = self.link.take() {
            self.ensure_block()
                .push_inline(InlineContent::Link { link, content });
        }
        if let Some(block) = self.current.take() {
            self.doc.add_block(block);
        }
    }

    fn ensure_block(&mut self) -> &mut Block {
        let block_type = self.context_block_type();
        self.current.get_or_insert_with(|| Block::new(0, block_type))
    }

    fn push_inline(&mut self, item: InlineContent) {
        if let Some((_, content)) = self.link.as_mut() {
            push_merged(content, item);
        } else {
            self.ensure_block().push_inline(item);
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, alt)) = self.image.as_mut() {
            alt.push_str(text);
            return;
        }
        if self.in_code_block {
            self.ensure_block()
                .push_inline(InlineContent::Text(TextRun::plain(text.to_string())));
            return;
        }
        let style = self.style();
        self.push_inline(InlineContent::Text(TextRun::new(text.to_string(), style)));
    }

    /// Underline and highlight survive Markdown as raw <u>/<mark> tags
    fn inline_html(&mut self, html: &str) {
        match html.trim().to_ascii_lowercase().as_str() {
            "<u>" => self.push_style(|s| s.underline = true),
            "<mark>" => self.push_style(|s| s.highlight = true),
            "</u>" | "</mark>" => {
                self.style_stack.pop();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                let context = self.context_block_type();
                let reuse = matches!(
                    &self.current,
                    Some(block) if block.content.is_empty() && block.block_type == context
                );
                if !reuse {
                    self.start_block(context);
                }
            }
            Tag::Heading { level, .. } => self.start_block(BlockType::Heading {
                level: level as u8,
            }),
            Tag::BlockQuote(_) => {
                self.finish_block();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Indented => None,
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(String::from),
                };
                self.start_block(BlockType::CodeBlock { language });
                self.in_code_block = true;
            }
            Tag::List(start_number) => {
                self.finish_block();
                self.lists.push(start_number.is_some());
            }
            Tag::Item => {
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.start_block(BlockType::ListItem { ordered });
            }
            Tag::Emphasis => self.push_style(|s| s.italic = true),
            Tag::Strong => self.push_style(|s| s.bold = true),
            Tag::Strikethrough => self.push_style(|s| s.strikethrough = true),
            Tag::Link {
                dest_url, title, ..
            } => {
                let link = Link {
                    href: dest_url.to_string(),
                    target: Some("_blank".to_string()),
                    title: if title.is_empty() {
                        None
                    } else {
                        Some(title.to_string())
                    },
                };
                self.link = Some((link, Vec::new()));
            }
            Tag::Image { dest_url, .. } => {
                self.image = Some((dest_url.to_string(), String::new()));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item => self.finish_block(),
            TagEnd::CodeBlock => {
                if let Some(block) = self.current.as_mut()
                    && let Some(InlineContent::Text(run)) = block.content.last_mut()
                    && run.text.ends_with('\n')
                {
                    run.text.pop();
                }
                self.in_code_block = false;
                self.finish_block();
            }
            TagEnd::BlockQuote(_) => {
                self.finish_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::List(_) => {
                self.finish_block();
                self.lists.pop();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link => {
                if let Some((link, content)) = self.link.take() {
                    self.ensure_block()
                        .push_inline(InlineContent::Link { link, content });
                }
            }
            TagEnd::Image => {
                if let Some((src, alt)) = self.image.take() {
                    // Images are blocks: split the surrounding paragraph around them
                    let interrupted = self
                        .current
                        .as_ref()
                        .is_some_and(|block| !block.content.is_empty());
                    if interrupted {
                        self.finish_block();
                    } else {
                        self.current = None;
                    }
                    let mut image = Block::image(0, src);
                    if let BlockType::Image { alt: image_alt, .. } = &mut image.block_type
                        && !alt.is_empty()
                    {
                        *image_alt = Some(alt);
                    }
                    self.doc.add_block(image);
                }
            }
            _ => {}
        }
    }
}
