//! Markdown rendering.
//!
//! Uses pulldown-cmark, with the parser options and a few event-stream
//! rewrites driven by [`MarkdownConfig`] and [`SyntaxConfig`]:
//!
//! | Setting | Effect |
//! |---------|--------|
//! | `engine = "redcarpet"` | tables and strikethrough on top of CommonMark |
//! | `engine = "commonmark"` | strict CommonMark |
//! | `smartypants` | curly quotes, en/em dashes, ellipses |
//! | `fenced_code_blocks = false` | fences are plain text, not code |
//! | `autolink` | bare `http://`, `https://` and `www.` URLs become links |
//! | `with_toc_data` | headings get unique slug ids; a TOC is returned |
//! | `syntax.enabled` | fenced code wrapped in `pre.highlight` with a language class |
//! | `syntax.line_anchors` | each code line gets an `L<n>` id |

use crate::config::{MarkdownConfig, MarkdownEngine, SyntaxConfig};
use maud::html;
use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream,
    html::push_html,
};
use serde::Serialize;
use std::collections::HashSet;

/// A heading collected while rendering with `with_toc_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Output of [`MarkdownRenderer::render`].
#[derive(Debug, Clone)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Markdown → HTML renderer configured once per build.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
    markdown: MarkdownConfig,
    syntax: SyntaxConfig,
}

impl MarkdownRenderer {
    pub fn new(markdown: &MarkdownConfig, syntax: &SyntaxConfig) -> Self {
        let mut options = Options::empty();
        if markdown.engine == MarkdownEngine::Redcarpet {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if markdown.smartypants {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        Self {
            options,
            markdown: markdown.clone(),
            syntax: syntax.clone(),
        }
    }

    pub fn render(&self, source: &str) -> Rendered {
        let parser = Parser::new_ext(source, self.options);
        let events: Vec<Event<'_>> = TextMergeStream::new(parser).collect();

        let mut events = self.rewrite_code_blocks(events);
        if self.markdown.autolink {
            events = autolink(events);
        }
        let toc = if self.markdown.with_toc_data {
            anchor_headings(&mut events)
        } else {
            Vec::new()
        };

        let mut html = String::with_capacity(source.len() * 2);
        push_html(&mut html, events.into_iter());
        Rendered { html, toc }
    }

    /// Buffer each fenced block and re-emit it per the fence/syntax settings.
    /// Indented code blocks pass through untouched.
    fn rewrite_code_blocks<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        let mut fenced: Option<(String, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    fenced = Some((info.to_string(), String::new()));
                }
                Event::Text(text) if fenced.is_some() => {
                    if let Some((_, body)) = fenced.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if fenced.is_some() => {
                    if let Some((info, body)) = fenced.take() {
                        out.extend(self.fenced_block(info, body));
                    }
                }
                other => out.push(other),
            }
        }
        out
    }

    fn fenced_block<'a>(&self, info: String, body: String) -> Vec<Event<'a>> {
        if !self.markdown.fenced_code_blocks {
            return vec![
                Event::Start(Tag::Paragraph),
                Event::Text(format!("```{info}\n{body}```").into()),
                Event::End(TagEnd::Paragraph),
            ];
        }
        if self.syntax.enabled {
            return vec![Event::Html(
                highlight(&info, &body, self.syntax.line_anchors).into(),
            )];
        }
        vec![
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info.into()))),
            Event::Text(body.into()),
            Event::End(TagEnd::CodeBlock),
        ]
    }
}

/// `pre.highlight` markup for a fenced block. Content is escaped by maud.
fn highlight(info: &str, body: &str, line_anchors: bool) -> String {
    let lang = info.split_whitespace().next().filter(|l| !l.is_empty());
    let class = lang.map(|l| format!("language-{l}"));
    let code = body.strip_suffix('\n').unwrap_or(body);

    let markup = html! {
        pre.highlight data-lang=[lang] {
            code class=[class] {
                @if line_anchors {
                    @for (i, line) in code.lines().enumerate() {
                        span.line id={ "L" (i + 1) } { (line) } "\n"
                    }
                } @else {
                    (code)
                }
            }
        }
    };
    let mut out = markup.into_string();
    out.push('\n');
    out
}

// ============================================================================
// Autolinking
// ============================================================================

const URL_PREFIXES: &[&str] = &["https://", "http://", "www."];

/// Turn bare URLs in text into links, skipping link, image and code content.
fn autolink(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut suppress = 0usize;

    for event in events {
        match &event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                suppress += 1
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                suppress = suppress.saturating_sub(1)
            }
            _ => {}
        }
        match event {
            Event::Text(text) if suppress == 0 => push_autolinked(text, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn push_autolinked<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    if next_url(&text).is_none() {
        out.push(Event::Text(text));
        return;
    }

    let mut rest: &str = &text;
    while let Some((start, end)) = next_url(rest) {
        if start > 0 {
            out.push(Event::Text(rest[..start].to_string().into()));
        }
        let url = &rest[start..end];
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: href.into(),
            title: "".into(),
            id: "".into(),
        }));
        out.push(Event::Text(url.to_string().into()));
        out.push(Event::End(TagEnd::Link));
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        out.push(Event::Text(rest.to_string().into()));
    }
}

/// Byte range of the next bare URL in `text`.
///
/// A URL starts at a word boundary and runs to whitespace or `<`; trailing
/// sentence punctuation is not part of it.
fn next_url(text: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while from < text.len() {
        let (start, prefix) = URL_PREFIXES
            .iter()
            .filter_map(|p| text[from..].find(p).map(|i| (from + i, *p)))
            .min_by_key(|(i, _)| *i)?;

        let at_boundary = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || "(<\"'\u{201c}\u{2018}".contains(c));

        let mut end = text[start..]
            .find(|c: char| c.is_whitespace() || c == '<')
            .map_or(text.len(), |i| start + i);
        while end > start {
            match text[..end].chars().next_back() {
                Some(c) if ".,;:!?)'\"\u{201d}\u{2019}".contains(c) => end -= c.len_utf8(),
                _ => break,
            }
        }

        if at_boundary && end > start + prefix.len() {
            return Some((start, end));
        }
        from = start + 1;
    }
    None
}

// ============================================================================
// Heading anchors
// ============================================================================

/// Give every heading a unique slug id and return the table of contents.
fn anchor_headings(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    let mut used = HashSet::new();
    let mut i = 0;

    while i < events.len() {
        if let Event::Start(Tag::Heading { level, .. }) = &events[i] {
            let level = *level as u8;
            let mut text = String::new();
            let mut j = i + 1;
            while j < events.len() && !matches!(events[j], Event::End(TagEnd::Heading(_))) {
                if let Event::Text(t) | Event::Code(t) = &events[j] {
                    text.push_str(t);
                }
                j += 1;
            }

            let id = unique_id(&slugify(&text), &mut used);
            if let Event::Start(Tag::Heading { id: heading_id, .. }) = &mut events[i] {
                *heading_id = Some(id.clone().into());
            }
            toc.push(TocEntry {
                level,
                text: text.trim().to_string(),
                id,
            });
            i = j;
        }
        i += 1;
    }
    toc
}

/// Lowercase alphanumerics, with every other run collapsed to a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "section" } else { base };
    let mut candidate = base.to_string();
    let mut n = 0;
    while !used.insert(candidate.clone()) {
        n += 1;
        candidate = format!("{base}-{n}");
    }
    candidate
}
