//! Search and replace over rich-text content.
//!
//! Matching is always case-insensitive and literal: the query is escaped
//! before it is compiled, so `a.b` only matches the text `a.b`.
//!
//! Counting runs on the plain-text projection of a document. Replacing
//! can run in two ways (see [`ReplaceStrategy`]):
//!
//! * [`ReplaceStrategy::Markup`] substitutes on the serialized HTML and
//!   re-parses it. A query split by a tag boundary (`foo<strong>bar</strong>`)
//!   is not found, and a query that also occurs inside an attribute value
//!   (a link target, an image source) is replaced there too. The match count
//!   shown to the user is therefore only an estimate of what gets replaced.
//! * [`ReplaceStrategy::TextNodes`] walks the document and substitutes inside
//!   text runs only. Tag names and attribute values are never touched.
//!   Matches spanning two differently styled runs are still not found.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::richtext::html_converter::{document_to_html, html_to_document};

/// The view of an editor the search engine works against.
pub trait EditingSurface {
    /// Plain-text projection of the current content
    fn plain_text(&self) -> String;

    /// Tagged-markup serialization of the current content
    fn markup(&self) -> String;

    /// Replace the current content wholesale
    fn set_markup(&mut self, markup: &str);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// Substitute on the serialized markup
    #[default]
    Markup,
    /// Substitute inside text runs only
    TextNodes,
}

impl FromStr for ReplaceStrategy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "markup" => Ok(ReplaceStrategy::Markup),
            "text-nodes" | "text_nodes" | "textnodes" => Ok(ReplaceStrategy::TextNodes),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for ReplaceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaceStrategy::Markup => write!(f, "markup"),
            ReplaceStrategy::TextNodes => write!(f, "text-nodes"),
        }
    }
}

/// What a replace-all did. Finding nothing is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    NoMatches,
    Replaced { count: usize },
}

impl ReplaceOutcome {
    pub fn replaced_count(&self) -> usize {
        match self {
            ReplaceOutcome::NoMatches => 0,
            ReplaceOutcome::Replaced { count } => *count,
        }
    }

    /// The notice shown to the user after a replace-all
    pub fn notice(&self) -> &'static str {
        match self {
            ReplaceOutcome::NoMatches => "No matches found.",
            ReplaceOutcome::Replaced { .. } => "Replaced successfully!",
        }
    }
}

/// Compile `query` as a case-insensitive literal pattern.
/// Returns `None` for an empty query.
pub fn query_regex(query: &str) -> Result<Option<Regex>> {
    if query.is_empty() {
        return Ok(None);
    }
    let regex = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()?;
    Ok(Some(regex))
}

/// Count case-insensitive, non-overlapping occurrences of `query` in `text`.
pub fn count_matches(text: &str, query: &str) -> usize {
    match query_regex(query) {
        Ok(Some(regex)) => regex.find_iter(text).count(),
        Ok(None) => 0,
        Err(err) => {
            warn!("Cannot search for {:?}: {}", query, err);
            0
        }
    }
}

/// Count occurrences of `query` in the surface's plain-text projection.
pub fn count_document_matches(surface: &dyn EditingSurface, query: &str) -> usize {
    if query.is_empty() {
        return 0;
    }
    count_matches(&surface.plain_text(), query)
}

/// Replace every occurrence of `query` in `markup`.
/// Returns the new markup and the number of matches substituted.
pub fn replace_in_markup(markup: &str, query: &str, replacement: &str) -> Result<(String, usize)> {
    let Some(regex) = query_regex(query)? else {
        return Ok((markup.to_string(), 0));
    };
    let count = regex.find_iter(markup).count();
    let replaced = regex.replace_all(markup, NoExpand(replacement));
    Ok((replaced.into_owned(), count))
}

/// Replace every occurrence of `query` inside the text runs of `markup`,
/// leaving tags and attribute values alone.
pub fn replace_in_text_nodes(
    markup: &str,
    query: &str,
    replacement: &str,
) -> Result<(String, usize)> {
    let Some(regex) = query_regex(query)? else {
        return Ok((markup.to_string(), 0));
    };

    let mut doc = html_to_document(markup);
    let mut count = 0;
    for block in doc.blocks_mut().iter_mut() {
        block.for_each_text_run_mut(|run| {
            let found = regex.find_iter(&run.text).count();
            if found > 0 {
                run.text = regex
                    .replace_all(&run.text, NoExpand(replacement))
                    .into_owned();
                count += found;
            }
        });
        block.normalize();
    }

    if count == 0 {
        return Ok((markup.to_string(), 0));
    }
    Ok((document_to_html(&doc), count))
}

/// Replace every occurrence of `query` with `replacement` across the surface.
///
/// When the markup comes out unchanged the surface is left untouched and
/// [`ReplaceOutcome::NoMatches`] is returned. Otherwise the surface content
/// is replaced wholesale, which also resets its undo history.
pub fn replace_all(
    surface: &mut dyn EditingSurface,
    query: &str,
    replacement: &str,
    strategy: ReplaceStrategy,
) -> Result<ReplaceOutcome> {
    if query.is_empty() {
        return Ok(ReplaceOutcome::NoMatches);
    }

    let markup = surface.markup();
    let (new_markup, count) = match strategy {
        ReplaceStrategy::Markup => replace_in_markup(&markup, query, replacement)?,
        ReplaceStrategy::TextNodes => replace_in_text_nodes(&markup, query, replacement)?,
    };

    if new_markup == markup {
        debug!("Replace {:?} ({}): markup unchanged", query, strategy);
        return Ok(ReplaceOutcome::NoMatches);
    }

    surface.set_markup(&new_markup);
    debug!(
        "Replace {:?} -> {:?} ({}): {} substitution(s)",
        query, replacement, strategy, count
    );
    Ok(ReplaceOutcome::Replaced { count })
}
