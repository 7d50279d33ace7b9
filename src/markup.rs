//! Markdown to safe HTML conversion for titles and descriptions.
//!
//! Schema and codelist descriptions are untrusted markdown. Rendering escapes raw
//! HTML and drops script-capable link targets, so the output can be embedded by the
//! presentation layer without further escaping.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};
use serde::{Serialize, Serializer};
use std::fmt;

/// URL schemes that must never reach an `href` or `src` attribute.
const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Pre-escaped HTML rendered from markdown, plus its plain-text content.
///
/// Serializes as the HTML string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SafeHtml {
    html: String,
    text: String,
}

impl SafeHtml {
    /// The rendered HTML. Must not be escaped again.
    pub fn as_html(&self) -> &str {
        &self.html
    }

    /// Text content with markup removed, used for tokenization and plain-text output.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

impl Serialize for SafeHtml {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.html)
    }
}

/// Render markdown to [`SafeHtml`]. An empty source renders to empty HTML.
pub fn render_markdown(source: &str) -> SafeHtml {
    if source.is_empty() {
        return SafeHtml::default();
    }

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events: Vec<Event<'_>> = Parser::new_ext(source, options).map(sanitize).collect();

    let mut html_out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut html_out, events.iter().cloned());

    SafeHtml {
        html: html_out,
        text: plain_text(&events),
    }
}

/// Escape plain text (titles) into [`SafeHtml`] without markdown interpretation.
pub fn escape_text(source: &str) -> SafeHtml {
    let mut html_out = String::with_capacity(source.len());
    html::push_html(&mut html_out, std::iter::once(Event::Text(CowStr::Borrowed(source))));

    SafeHtml {
        html: html_out,
        text: source.to_string(),
    }
}

/// Neutralize raw HTML and unsafe link targets.
fn sanitize(event: Event<'_>) -> Event<'_> {
    match event {
        // Text events are escaped by the HTML writer
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let lowered = url.trim_start().to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        tracing::debug!("Dropping unsafe link target in description");
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Collect the text content of rendered events, separating blocks with spaces.
fn plain_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::BlockQuote(_)
                | TagEnd::CodeBlock
                | TagEnd::Item
                | TagEnd::TableCell,
            ) => {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
    text.truncate(text.trim_end().len());
    text
}
