//! HTML rendering of assistant text.
//!
//! Two passes exist. [`render_streaming`] runs on every chunk and only
//! escapes the text and turns newlines into `<br>`. [`render_markdown`] runs
//! once on the complete reply: GitHub-flavoured markdown with hard line
//! breaks, and fenced code blocks highlighted by syntect.
//!
//! Raw HTML inside model output is escaped rather than passed through.

use std::sync::LazyLock;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::warn;

// Loaded once, on first final render.
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// CSS class prefix for highlighted tokens, compatible with highlight.js themes.
const CLASS_PREFIX: &str = "hljs-";

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Cheap per-chunk transform: escaped text with `<br>` line breaks.
pub fn render_streaming(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

/// Full markdown render used once the reply is complete.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_GFM);

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code_block: Option<(Option<String>, String)> = None;

    for event in Parser::new_ext(text, options) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info),
                    CodeBlockKind::Indented => None,
                };
                code_block = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, code)) = code_block.take() {
                    events.push(Event::Html(CowStr::from(code_block_html(
                        &code,
                        lang.as_deref(),
                    ))));
                }
            }
            Event::Text(text) => match code_block.as_mut() {
                Some((_, code)) => code.push_str(&text),
                None => events.push(Event::Text(text)),
            },
            // Newlines inside a paragraph become visible line breaks.
            Event::SoftBreak => events.push(Event::HardBreak),
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn fence_language(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn code_block_html(code: &str, lang: Option<&str>) -> String {
    let class = match lang {
        Some(lang) => format!("hljs language-{}", escape_html(lang)),
        None => "hljs".to_string(),
    };
    format!(
        "<pre><code class=\"{class}\">{}</code></pre>\n",
        highlight_code(code, lang)
    )
}

fn find_syntax(code: &str, lang: Option<&str>) -> &'static SyntaxReference {
    let set: &'static SyntaxSet = &SYNTAX_SET;
    lang.and_then(|token| set.find_syntax_by_token(token))
        .or_else(|| set.find_syntax_by_first_line(code))
        .unwrap_or_else(|| set.find_syntax_plain_text())
}

/// Highlight a code snippet into classed HTML spans.
///
/// Unknown languages fall back to first-line detection and then plain text.
pub fn highlight_code(code: &str, lang: Option<&str>) -> String {
    let syntax = find_syntax(code, lang);
    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        &SYNTAX_SET,
        ClassStyle::SpacedPrefixed {
            prefix: CLASS_PREFIX,
        },
    );
    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            warn!("Syntax highlighting failed, rendering plain code: {e}");
            return escape_html(code);
        }
    }
    generator.finalize()
}
