// HTML Converter
// Converts between StructuredDocument and the HTML subset a rich-text blog editor emits.
// Parsing is lenient: any string yields a document. Unknown tags are transparent,
// stray text is wrapped in a paragraph and unmatched closing tags are ignored.

use std::sync::LazyLock;

use regex::Regex;

use super::structured_document::*;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9]*)((?:\s(?:[^<>"']|"[^"]*"|'[^']*')*)?)/?>"#)
        .expect("tag pattern is valid")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n\f]+").expect("whitespace pattern is valid"));

const LINK_REL: &str = "noopener noreferrer nofollow";

/// Convert HTML to a StructuredDocument
pub fn html_to_document(html: &str) -> StructuredDocument {
    let mut builder = DocumentBuilder::default();
    for token in tokenize(html) {
        builder.feed(token);
    }
    builder.finish()
}

/// Plain-text projection of stored HTML
pub fn html_to_plain_text(html: &str) -> String {
    html_to_document(html).to_plain_text()
}

/// Convert a StructuredDocument to HTML
pub fn document_to_html(doc: &StructuredDocument) -> String {
    let mut output = String::new();
    let mut open: Option<Container> = None;

    for block in doc.blocks() {
        let wanted = Container::for_block(&block.block_type);
        if wanted != open {
            if let Some(container) = open {
                output.push_str(container.close_tag());
            }
            if let Some(container) = wanted {
                output.push_str(container.open_tag());
            }
            open = wanted;
        }
        write_block(&mut output, block);
    }

    if let Some(container) = open {
        output.push_str(container.close_tag());
    }

    output
}

/// Escape text content
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value (double-quoted)
pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Decode the character references the serializer produces, plus numeric ones.
/// Anything unrecognised is kept literally.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .and_then(|(semi, _)| decode_entity(&candidate[1..semi]).map(|ch| (ch, semi)));

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    BulletList,
    OrderedList,
    Quote,
}

impl Container {
    fn for_block(block_type: &BlockType) -> Option<Self> {
        match block_type {
            BlockType::ListItem { ordered: true } => Some(Container::OrderedList),
            BlockType::ListItem { ordered: false } => Some(Container::BulletList),
            BlockType::BlockQuote => Some(Container::Quote),
            _ => None,
        }
    }

    fn open_tag(&self) -> &'static str {
        match self {
            Container::BulletList => "<ul>",
            Container::OrderedList => "<ol>",
            Container::Quote => "<blockquote>",
        }
    }

    fn close_tag(&self) -> &'static str {
        match self {
            Container::BulletList => "</ul>",
            Container::OrderedList => "</ol>",
            Container::Quote => "</blockquote>",
        }
    }
}

fn align_attr(block: &Block) -> String {
    match block.align {
        Some(align) if block.block_type.supports_align() => {
            format!(" style=\"text-align: {}\"", align.as_str())
        }
        _ => String::new(),
    }
}

fn write_block(output: &mut String, block: &Block) {
    match &block.block_type {
        BlockType::Paragraph => {
            output.push_str(&format!("<p{}>", align_attr(block)));
            write_inline(output, &block.content);
            output.push_str("</p>");
        }
        BlockType::Heading { level } => {
            output.push_str(&format!("<h{}{}>", level, align_attr(block)));
            write_inline(output, &block.content);
            output.push_str(&format!("</h{}>", level));
        }
        BlockType::CodeBlock { language } => {
            output.push_str("<pre><code");
            if let Some(lang) = language {
                output.push_str(&format!(" class=\"language-{}\"", escape_attr(lang)));
            }
            output.push('>');
            output.push_str(&escape_text(&block.to_plain_text()));
            output.push_str("</code></pre>");
        }
        BlockType::BlockQuote => {
            output.push_str("<p>");
            write_inline(output, &block.content);
            output.push_str("</p>");
        }
        BlockType::ListItem { .. } => {
            output.push_str("<li><p>");
            write_inline(output, &block.content);
            output.push_str("</p></li>");
        }
        BlockType::Image { src, alt, width } => {
            output.push_str(&format!("<img src=\"{}\"", escape_attr(src)));
            if let Some(alt) = alt {
                output.push_str(&format!(" alt=\"{}\"", escape_attr(alt)));
            }
            if let Some(width) = width {
                output.push_str(&format!(" width=\"{}\"", width));
            }
            output.push('>');
        }
        BlockType::HorizontalRule => output.push_str("<hr>"),
    }
}

fn write_inline(output: &mut String, content: &[InlineContent]) {
    for item in content {
        match item {
            InlineContent::Text(run) => write_run(output, run),
            InlineContent::Link { link, content } => {
                output.push_str(&format!("<a href=\"{}\"", escape_attr(&link.href)));
                if let Some(target) = &link.target {
                    output.push_str(&format!(
                        " target=\"{}\" rel=\"{}\"",
                        escape_attr(target),
                        LINK_REL
                    ));
                }
                if let Some(title) = &link.title {
                    output.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                output.push('>');
                write_inline(output, content);
                output.push_str("</a>");
            }
            InlineContent::HardBreak => output.push_str("<br>"),
        }
    }
}

fn write_run(output: &mut String, run: &TextRun) {
    let style = &run.style;
    // Outermost first
    let mut tags: Vec<(String, &str)> = Vec::new();
    if let Some(color) = &style.color {
        tags.push((
            format!("<span style=\"color: {}\">", escape_attr(color)),
            "</span>",
        ));
    }
    if style.highlight {
        tags.push(("<mark>".to_string(), "</mark>"));
    }
    if style.bold {
        tags.push(("<strong>".to_string(), "</strong>"));
    }
    if style.italic {
        tags.push(("<em>".to_string(), "</em>"));
    }
    if style.underline {
        tags.push(("<u>".to_string(), "</u>"));
    }
    if style.strikethrough {
        tags.push(("<s>".to_string(), "</s>"));
    }
    if style.code {
        tags.push(("<code>".to_string(), "</code>"));
    }

    for (open, _) in &tags {
        output.push_str(open);
    }
    output.push_str(&escape_text(&run.text));
    for (_, close) in tags.iter().rev() {
        output.push_str(close);
    }
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Close {
        name: String,
    },
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in TAG_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            tokens.push(Token::Text(&html[last..whole.start()]));
        }
        last = whole.end();

        let name = caps[2].to_ascii_lowercase();
        if !caps[1].is_empty() {
            tokens.push(Token::Close { name });
        } else {
            let attrs = caps
                .get(3)
                .map(|m| parse_attrs(m.as_str()))
                .unwrap_or_default();
            tokens.push(Token::Open { name, attrs });
        }
    }

    if last < html.len() {
        tokens.push(Token::Text(&html[last..]));
    }
    tokens
}

fn parse_attrs(source: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(source)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Look up one property of an inline `style` attribute
fn style_property(attrs: &[(String, String)], property: &str) -> Option<String> {
    attr(attrs, "style")?.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim().eq_ignore_ascii_case(property)).then(|| value.trim().to_string())
    })
}

fn heading_level(name: &str) -> Option<u8> {
    let level = name.strip_prefix('h')?.parse::<u8>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

#[derive(Debug, Clone)]
enum Mark {
    Flag(StyleFlag),
    Color(Option<String>),
}

#[derive(Debug)]
struct StyleFrame {
    tag: &'static str,
    mark: Mark,
}

/// Streaming builder fed with tokens in document order
#[derive(Default)]
struct DocumentBuilder {
    doc: StructuredDocument,
    current: Option<Block>,
    styles: Vec<StyleFrame>,
    link: Option<(Link, Vec<InlineContent>)>,
    lists: Vec<bool>,
    quote_depth: usize,
    in_pre: bool,
}

impl DocumentBuilder {
    fn feed(&mut self, token: Token<'_>) {
        match token {
            Token::Text(raw) => self.text(raw),
            Token::Open { name, attrs } => self.open(&name, &attrs),
            Token::Close { name } => self.close(&name),
        }
    }

    fn finish(mut self) -> StructuredDocument {
        self.finish_block();
        if self.doc.is_empty() {
            self.doc.add_block(Block::paragraph(0));
        }
        self.doc
    }

    fn current_style(&self) -> TextStyle {
        let mut style = TextStyle::plain();
        for frame in &self.styles {
            match &frame.mark {
                Mark::Flag(flag) => style.set(*flag, true),
                Mark::Color(color) => {
                    if color.is_some() {
                        style.color = color.clone();
                    }
                }
            }
        }
        style
    }

    /// Block type implied by the enclosing containers
    fn context_block_type(&self) -> BlockType {
        if self.in_pre {
            BlockType::CodeBlock { language: None }
        } else if let Some(&ordered) = self.lists.last() {
            BlockType::ListItem { ordered }
        } else if self.quote_depth > 0 {
            BlockType::BlockQuote
        } else {
            BlockType::Paragraph
        }
    }

    fn start_block(&mut self, block_type: BlockType, align: Option<TextAlign>) {
        self.finish_block();
        let mut block = Block::new(0, block_type);
        block.align = align;
        self.current = Some(block);
    }

    fn finish_block(&mut self) {
        self.flush_link();
        if let Some(block) = self.current.take() {
            self.doc.add_block(block);
        }
    }

    fn ensure_block(&mut self) -> &mut Block {
        let block_type = self.context_block_type();
        self.current.get_or_insert_with(|| Block::new(0, block_type))
    }

    fn flush_link(&mut self) {
        if let Some((link, content)) = self.link.take()
            && !content.is_empty()
        {
            self.ensure_block()
                .push_inline(InlineContent::Link { link, content });
        }
    }

    fn push_inline(&mut self, item: InlineContent) {
        if let Some((_, content)) = self.link.as_mut() {
            push_merged(content, item);
        } else {
            self.ensure_block().push_inline(item);
        }
    }

    fn text(&mut self, raw: &str) {
        if self.in_pre {
            let text = decode_entities(raw);
            self.ensure_block()
                .push_inline(InlineContent::Text(TextRun::plain(text)));
            return;
        }

        let collapsed = WHITESPACE_RE.replace_all(raw, " ");
        if self.current.is_none() && self.link.is_none() && collapsed.trim().is_empty() {
            return;
        }
        let text = decode_entities(&collapsed);
        let style = self.current_style();
        self.push_inline(InlineContent::Text(TextRun::new(text, style)));
    }

    fn push_frame(&mut self, tag: &'static str, mark: Mark) {
        self.styles.push(StyleFrame { tag, mark });
    }

    fn pop_frame(&mut self, tag: &str) {
        if let Some(index) = self.styles.iter().rposition(|frame| frame.tag == tag) {
            self.styles.remove(index);
        }
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)]) {
        let align = style_property(attrs, "text-align").and_then(|v| TextAlign::parse(&v));

        match name {
            "p" => {
                let context = self.context_block_type();
                // <li><p> and <blockquote><p> fill the block the container opened
                let reuse = matches!(
                    &self.current,
                    Some(block) if block.content.is_empty() && block.block_type == context
                ) && self.link.is_none();
                if reuse {
                    if let Some(block) = self.current.as_mut() {
                        block.align = align;
                    }
                } else {
                    self.start_block(context, align);
                }
            }
            "pre" => {
                self.finish_block();
                self.in_pre = true;
                self.start_block(BlockType::CodeBlock { language: None }, None);
            }
            "code" if self.in_pre => {
                let language = attr(attrs, "class").and_then(|class| {
                    class
                        .split_whitespace()
                        .find_map(|c| c.strip_prefix("language-"))
                        .map(str::to_string)
                });
                if let Some(block) = self.current.as_mut()
                    && let BlockType::CodeBlock { language: lang } = &mut block.block_type
                {
                    *lang = language;
                }
            }
            "blockquote" => {
                self.finish_block();
                self.quote_depth += 1;
            }
            "ul" | "ol" => {
                self.finish_block();
                self.lists.push(name == "ol");
            }
            "li" => {
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.start_block(BlockType::ListItem { ordered }, None);
            }
            "img" => {
                let Some(src) = attr(attrs, "src") else {
                    return;
                };
                let block_type = BlockType::Image {
                    src: src.to_string(),
                    alt: attr(attrs, "alt").map(str::to_string),
                    width: attr(attrs, "width").and_then(|w| w.trim().parse().ok()),
                };
                // `<p><img></p>` is just the image
                let wrapper_is_empty = self.link.is_none()
                    && self
                        .current
                        .as_ref()
                        .is_some_and(|block| block.content.is_empty());
                if wrapper_is_empty {
                    self.current = None;
                } else {
                    self.finish_block();
                }
                self.doc.add_block(Block::new(0, block_type));
            }
            "hr" => {
                self.finish_block();
                self.doc
                    .add_block(Block::new(0, BlockType::HorizontalRule));
            }
            "br" => {
                if self.in_pre {
                    self.ensure_block()
                        .push_inline(InlineContent::Text(TextRun::plain("\n")));
                } else {
                    self.push_inline(InlineContent::HardBreak);
                }
            }
            "strong" | "b" => self.push_frame("strong", Mark::Flag(StyleFlag::Bold)),
            "em" | "i" => self.push_frame("em", Mark::Flag(StyleFlag::Italic)),
            "u" => self.push_frame("u", Mark::Flag(StyleFlag::Underline)),
            "s" | "strike" | "del" => self.push_frame("s", Mark::Flag(StyleFlag::Strikethrough)),
            "code" => self.push_frame("code", Mark::Flag(StyleFlag::Code)),
            "mark" => self.push_frame("mark", Mark::Flag(StyleFlag::Highlight)),
            "span" => {
                let color = style_property(attrs, "color");
                self.push_frame("span", Mark::Color(color));
            }
            "a" => {
                self.flush_link();
                let link = Link {
                    href: attr(attrs, "href").unwrap_or_default().to_string(),
                    target: attr(attrs, "target").map(str::to_string),
                    title: attr(attrs, "title").map(str::to_string),
                };
                self.link = Some((link, Vec::new()));
            }
            _ => {
                if let Some(level) = heading_level(name) {
                    self.start_block(BlockType::Heading { level }, align);
                }
            }
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "p" | "li" => self.finish_block(),
            "pre" => {
                self.finish_block();
                self.in_pre = false;
            }
            "code" if self.in_pre => {}
            "blockquote" => {
                self.finish_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            "ul" | "ol" => {
                self.finish_block();
                self.lists.pop();
            }
            "strong" | "b" => self.pop_frame("strong"),
            "em" | "i" => self.pop_frame("em"),
            "u" => self.pop_frame("u"),
            "s" | "strike" | "del" => self.pop_frame("s"),
            "code" => self.pop_frame("code"),
            "mark" => self.pop_frame("mark"),
            "span" => self.pop_frame("span"),
            "a" => self.flush_link(),
            _ => {
                if heading_level(name).is_some() {
                    self.finish_block();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_round_trip() {
        let html = "<p>Hello <strong>bold</strong> world</p>";
        let doc = html_to_document(html);
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.to_plain_text(), "Hello bold world");
        assert_eq!(document_to_html(&doc), html);
    }

    #[test]
    fn test_legacy_tags_are_normalised() {
        let doc = html_to_document("<p>foo<b>bar</b><i>baz</i></p>");
        assert_eq!(
            document_to_html(&doc),
            "<p>foo<strong>bar</strong><em>baz</em></p>"
        );
    }

    #[test]
    fn test_lists_group_items() {
        let html = "<ul><li><p>one</p></li><li><p>two</p></li></ul><ol><li><p>three</p></li></ol>";
        let doc = html_to_document(html);
        assert_eq!(doc.block_count(), 3);
        assert_eq!(
            doc.blocks()[2].block_type,
            BlockType::ListItem { ordered: true }
        );
        assert_eq!(document_to_html(&doc), html);
    }

    #[test]
    fn test_list_items_without_paragraphs() {
        let doc = html_to_document("<ul><li>one</li><li>two</li></ul>");
        assert_eq!(doc.block_count(), 2);
        assert_eq!(doc.to_plain_text(), "one\n\ntwo");
    }

    #[test]
    fn test_heading_alignment() {
        let html = "<h2 style=\"text-align: center\">Title</h2>";
        let doc = html_to_document(html);
        assert_eq!(doc.blocks()[0].align, Some(TextAlign::Center));
        assert_eq!(document_to_html(&doc), html);
    }

    #[test]
    fn test_link_attributes() {
        let html = "<p>see <a href=\"https://fox.example\" target=\"_blank\" rel=\"noopener noreferrer nofollow\">here</a></p>";
        let doc = html_to_document(html);
        match &doc.blocks()[0].content[1] {
            InlineContent::Link { link, .. } => {
                assert_eq!(link.href, "https://fox.example");
                assert_eq!(link.target.as_deref(), Some("_blank"));
            }
            other => panic!("expected link, got {:?}", other),
        }
        assert_eq!(document_to_html(&doc), html);
    }

    #[test]
    fn test_entities() {
        let doc = html_to_document("<p>a &amp; b &lt;c&gt; &#233; &#x41;</p>");
        assert_eq!(doc.to_plain_text(), "a & b <c> é A");
        assert_eq!(
            document_to_html(&doc),
            "<p>a &amp; b &lt;c&gt; é A</p>"
        );
    }

    #[test]
    fn test_unknown_entity_is_literal() {
        assert_eq!(decode_entities("fish &chips; & more"), "fish &chips; & more");
    }

    #[test]
    fn test_code_block_preserves_whitespace() {
        let html = "<pre><code class=\"language-rust\">fn main() {\n    let x = 1 &lt; 2;\n}</code></pre>";
        let doc = html_to_document(html);
        assert_eq!(
            doc.blocks()[0].block_type,
            BlockType::CodeBlock {
                language: Some("rust".to_string())
            }
        );
        assert_eq!(doc.to_plain_text(), "fn main() {\n    let x = 1 < 2;\n}");
        assert_eq!(document_to_html(&doc), html);
    }

    #[test]
    fn test_image_between_paragraphs() {
        let doc = html_to_document("<p>before<img src=\"a.png\" alt=\"A\" width=\"300\">after</p>");
        assert_eq!(doc.block_count(), 3);
        assert_eq!(
            doc.blocks()[1].block_type,
            BlockType::Image {
                src: "a.png".to_string(),
                alt: Some("A".to_string()),
                width: Some(300),
            }
        );
    }

    #[test]
    fn test_wrapped_image_is_one_block() {
        let doc = html_to_document("<p><img src=\"a.png\"></p>");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(document_to_html(&doc), "<img src=\"a.png\">");
    }

    #[test]
    fn test_stray_text_becomes_paragraph() {
        let doc = html_to_document("just text");
        assert_eq!(document_to_html(&doc), "<p>just text</p>");
    }

    #[test]
    fn test_corrupted_markup_still_parses() {
        // What replacing "<" with "" leaves behind
        let doc = html_to_document("p>Hello/p>");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.to_plain_text(), "p>Hello/p>");

        // Unmatched closing tags and unknown tags are ignored
        let doc = html_to_document("</strong><x>Hi</x></em>");
        assert_eq!(document_to_html(&doc), "<p>Hi</p>");
    }

    #[test]
    fn test_empty_input_gives_empty_paragraph() {
        let doc = html_to_document("");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(document_to_html(&doc), "<p></p>");
    }

    #[test]
    fn test_misnested_marks() {
        let doc = html_to_document("<p><strong>a<em>b</strong>c</em></p>");
        let block = &doc.blocks()[0];
        assert_eq!(block.to_plain_text(), "abc");
        assert!(block.range_has_style(1, 2, StyleFlag::Bold));
        assert!(block.range_has_style(2, 3, StyleFlag::Italic));
        assert!(!block.range_has_style(2, 3, StyleFlag::Bold));
    }
}
