use crate::types::{Item, PipelineError, Result};
use crate::utils::text;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt;
use tracing::debug;

/// The wire formats a source can declare. There is no detection: a body is
/// read as exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss2,
    /// RSS 1.0, an RDF document with `item` siblings of `channel`.
    Rdf,
    Atom,
}

impl FeedFormat {
    pub fn accept_header(self) -> &'static str {
        match self {
            FeedFormat::Rss2 => "application/rss+xml, application/xml;q=0.9, text/xml;q=0.8",
            FeedFormat::Rdf => "application/rdf+xml, application/rss+xml;q=0.9, application/xml;q=0.8",
            FeedFormat::Atom => "application/atom+xml, application/xml;q=0.9",
        }
    }

    fn root_element(self) -> &'static [u8] {
        match self {
            FeedFormat::Rss2 => b"rss",
            FeedFormat::Rdf => b"RDF",
            FeedFormat::Atom => b"feed",
        }
    }

    fn entry_element(self) -> &'static [u8] {
        match self {
            FeedFormat::Rss2 | FeedFormat::Rdf => b"item",
            FeedFormat::Atom => b"entry",
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFormat::Rss2 => f.write_str("RSS 2.0"),
            FeedFormat::Rdf => f.write_str("RDF"),
            FeedFormat::Atom => f.write_str("Atom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Comments,
    Description,
    Content,
    Published,
    Updated,
    Category,
}

impl Field {
    fn for_element(format: FeedFormat, name: &[u8]) -> Option<Field> {
        match (format, name) {
            (_, b"title") => Some(Field::Title),
            (FeedFormat::Rss2 | FeedFormat::Rdf, b"link") => Some(Field::Link),
            (FeedFormat::Rss2 | FeedFormat::Rdf, b"description") => Some(Field::Description),
            (FeedFormat::Rss2, b"comments") => Some(Field::Comments),
            (FeedFormat::Rss2, b"pubDate") => Some(Field::Published),
            (FeedFormat::Rss2, b"category") => Some(Field::Category),
            (FeedFormat::Rdf, b"dc:date") => Some(Field::Published),
            (FeedFormat::Rdf, b"dc:subject") => Some(Field::Category),
            (FeedFormat::Atom, b"summary") => Some(Field::Description),
            (FeedFormat::Atom, b"content") => Some(Field::Content),
            (FeedFormat::Atom, b"published") => Some(Field::Published),
            (FeedFormat::Atom, b"updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Entry fields as found in the document, before normalization.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    comments: Option<String>,
    description: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    categories: Vec<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Comments => &mut self.comments,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Category => {
                self.categories.push(value);
                return;
            }
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Atom keeps links and categories in attributes.
    fn apply_atom_attributes(&mut self, element: &BytesStart) {
        match element.name().as_ref() {
            b"link" => {
                let Some(href) = attribute(element, b"href") else {
                    return;
                };
                match attribute(element, b"rel").as_deref() {
                    None | Some("alternate") => self.set(Field::Link, href),
                    Some("replies") => self.set(Field::Comments, href),
                    _ => {}
                }
            }
            b"category" => {
                if let Some(term) = attribute(element, b"term") {
                    self.set(Field::Category, term);
                }
            }
            _ => {}
        }
    }
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn check_root(format: FeedFormat, element: &BytesStart) -> Result<()> {
    if element.local_name().as_ref() == format.root_element() {
        Ok(())
    } else {
        Err(PipelineError::Parse(format!(
            "Expected {} document, found <{}> root element",
            format,
            String::from_utf8_lossy(element.name().as_ref())
        )))
    }
}

/// Reads one source's documents into `Item`s.
pub struct FeedParser<'a> {
    format: FeedFormat,
    source: &'a str,
}

impl<'a> FeedParser<'a> {
    pub fn new(format: FeedFormat, source: &'a str) -> Self {
        Self { format, source }
    }

    /// Parse `body`, deriving each item's timestamp through `parse_date`.
    ///
    /// Entries without a link are skipped. An entry whose date no layout
    /// accepts is kept with `published_at` unset.
    pub fn parse<F>(&self, body: &str, parse_date: F) -> Result<Vec<Item>>
    where
        F: Fn(&str) -> Result<DateTime<Utc>>,
    {
        debug!("Parsing {} feed for {} ({} bytes)", self.format, self.source, body.len());

        let entries = self.read_entries(body)?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(item) = self.build_item(entry, &parse_date) {
                items.push(item);
            }
        }

        debug!("Parsed {} items from {}", items.len(), self.source);
        Ok(items)
    }

    fn read_entries(&self, body: &str) -> Result<Vec<RawEntry>> {
        let format = self.format;
        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;
        // Open entry and the depth of its element.
        let mut current: Option<(RawEntry, usize)> = None;
        // Field being collected and the depth of its element.
        let mut field: Option<(Field, usize)> = None;
        let mut text = String::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| PipelineError::Parse(format!("Malformed {} document: {}", format, e)))?;

            match event {
                Event::Start(element) => {
                    depth += 1;
                    if depth == 1 {
                        check_root(format, &element)?;
                        seen_root = true;
                        continue;
                    }

                    if current.is_none() {
                        if element.name().as_ref() == format.entry_element() {
                            current = Some((RawEntry::default(), depth));
                        }
                    } else if let Some((entry, entry_depth)) = current.as_mut() {
                        if depth == *entry_depth + 1 && field.is_none() {
                            if format == FeedFormat::Atom {
                                entry.apply_atom_attributes(&element);
                            }
                            if let Some(found) = Field::for_element(format, element.name().as_ref()) {
                                field = Some((found, depth));
                                text.clear();
                            }
                        }
                    }
                }
                Event::Empty(element) => {
                    if depth == 0 {
                        check_root(format, &element)?;
                        seen_root = true;
                        continue;
                    }
                    if let Some((entry, entry_depth)) = current.as_mut() {
                        if depth == *entry_depth && format == FeedFormat::Atom {
                            entry.apply_atom_attributes(&element);
                        }
                    }
                }
                Event::Text(content) => {
                    if field.is_some() {
                        // quick-xml rejects HTML entities such as `&nbsp;`; decode those by hand.
                        let value = content.unescape().map(|v| v.into_owned()).unwrap_or_else(|_| {
                            text::decode_entities(&String::from_utf8_lossy(&content))
                        });
                        text.push_str(&value);
                    }
                }
                Event::CData(content) => {
                    if field.is_some() {
                        text.push_str(&String::from_utf8_lossy(&content));
                    }
                }
                Event::End(_) => {
                    if let Some((open, field_depth)) = field {
                        if depth == field_depth {
                            if let Some((entry, _)) = current.as_mut() {
                                entry.set(open, std::mem::take(&mut text));
                            }
                            field = None;
                        }
                    }
                    if matches!(&current, Some((_, entry_depth)) if *entry_depth == depth) {
                        if let Some((entry, _)) = current.take() {
                            entries.push(entry);
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(PipelineError::Parse(format!(
                "Expected {} document, found no root element",
                format
            )));
        }
        if depth != 0 {
            return Err(PipelineError::Parse(format!(
                "Truncated {} document: {} unclosed elements",
                format, depth
            )));
        }

        Ok(entries)
    }

    fn build_item<F>(&self, entry: RawEntry, parse_date: &F) -> Option<Item>
    where
        F: Fn(&str) -> Result<DateTime<Utc>>,
    {
        let Some(link) = entry.link else {
            debug!("Skipping {} entry without a link: {:?}", self.source, entry.title);
            return None;
        };

        let title = entry
            .title
            .map(|t| text::collapse_whitespace(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let description = entry
            .description
            .or(entry.content)
            .map(|d| text::strip_html(&d))
            .unwrap_or_default();

        let published = entry.published.or(entry.updated).unwrap_or_default();
        let published_at = match parse_date(&published) {
            Ok(at) => Some(at),
            Err(e) => {
                debug!("Keeping {:?} without a timestamp: {}", title, e);
                None
            }
        };

        Some(Item {
            title,
            link,
            comments_url: entry.comments,
            description,
            published,
            source: self.source.to_string(),
            categories: entry.categories,
            published_at,
        })
    }
}
