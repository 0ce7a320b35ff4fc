// Rich text: the structured document model and its storage formats.
// HTML is the format blog content is stored and transported in; Markdown is import-only.

pub mod html_converter;
pub mod markdown_converter;
pub mod structured_document;
