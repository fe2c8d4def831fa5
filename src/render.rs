//! Markdown/MDX to feed-ready HTML.
//!
//! The transform parses the source with comrak and edits the arena in place:
//! JSX blocks are unwrapped, table-of-contents headings and MDX
//! `import`/`export` statements are dropped, anchors are made absolute. The
//! arena is then formatted by comrak and minified with `minify-html`.

use std::sync::OnceLock;

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use minify_html::Cfg;
use regex::Regex;

use crate::feed::FeedError;
use crate::urls::create_url;

fn toc_regex() -> &'static Regex {
    static TOC: OnceLock<Regex> = OnceLock::new();
    TOC.get_or_init(|| Regex::new(r"(?i)(table[ -]of[ -])?contents?|toc").expect("valid TOC regex"))
}

fn esm_regex() -> &'static Regex {
    static ESM: OnceLock<Regex> = OnceLock::new();
    ESM.get_or_init(|| Regex::new(r"^(import|export)\s").expect("valid ESM regex"))
}

/// Opening tag at the start of a block, and the matching close at its end.
fn jsx_open_regex() -> &'static Regex {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    OPEN.get_or_init(|| {
        Regex::new(r"^\s*<([A-Za-z][A-Za-z0-9-]*)(?:\s[^>]*?)?(/?)>").expect("valid tag regex")
    })
}

fn options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    // Source HTML is removed from the tree before formatting; what remains
    // was inserted by the transform itself.
    options.render.unsafe_ = true;
    options
}

/// Render markdown/MDX `source` to minified HTML with links resolved
/// against `site`.
pub fn mdx_to_html(source: &str, site: &str) -> Result<String, FeedError> {
    let arena = Arena::new();
    let options = options();

    let root = parse_document(&arena, source, &options);
    unwrap_jsx_blocks(&arena, root, &options);
    strip_toc(root);
    strip_esm(root);
    strip_inline_html(root);
    rewrite_links(&arena, root, site);

    let mut html = Vec::new();
    format_html(root, &options, &mut html).map_err(|e| FeedError::Render(e.to_string()))?;

    let mut cfg = Cfg::new();
    cfg.keep_closing_tags = true;
    let minified = minify_html::minify(&html, &cfg);

    Ok(String::from_utf8_lossy(&minified).trim().to_string())
}

/// Run [`mdx_to_html`] on the blocking pool.
pub async fn render_mdx(source: String, site: String) -> Result<String, FeedError> {
    tokio::task::spawn_blocking(move || mdx_to_html(&source, &site))
        .await
        .map_err(|e| FeedError::Render(e.to_string()))?
}

fn raw_block<'a>(arena: &'a Arena<AstNode<'a>>, literal: &str) -> &'a AstNode<'a> {
    arena.alloc(
        NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 6,
            literal: format!("{}\n", literal),
        })
        .into(),
    )
}

fn raw_inline<'a>(arena: &'a Arena<AstNode<'a>>, literal: &str) -> &'a AstNode<'a> {
    arena.alloc(NodeValue::HtmlInline(literal.to_string()).into())
}

/// Move the children of `from` in front of `anchor`, keeping their order.
fn splice_before<'a>(anchor: &'a AstNode<'a>, from: &'a AstNode<'a>) {
    let children: Vec<_> = from.children().collect();
    for child in children {
        child.detach();
        anchor.insert_before(child);
    }
}

/// Replace block-level HTML/JSX with its markdown content wrapped in a
/// `<div>`. Blocks without content (self-closing components, lone closing
/// tags, comments) are removed.
fn unwrap_jsx_blocks<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>, options: &Options) {
    let blocks: Vec<_> = root
        .descendants()
        .filter(|node| matches!(node.data.borrow().value, NodeValue::HtmlBlock(_)))
        .collect();

    for block in blocks {
        let inner = match &block.data.borrow().value {
            NodeValue::HtmlBlock(html) => jsx_inner(&html.literal),
            _ => None,
        };

        if let Some(inner) = inner {
            let fragment = parse_document(arena, &inner, options);
            unwrap_jsx_blocks(arena, fragment, options);

            block.insert_before(raw_block(arena, "<div>"));
            splice_before(block, fragment);
            block.insert_before(raw_block(arena, "</div>"));
        }
        block.detach();
    }
}

/// The markdown between an opening tag and its closing tag, if any.
fn jsx_inner(literal: &str) -> Option<String> {
    let open = jsx_open_regex().captures(literal)?;
    if !open[2].is_empty() {
        return None;
    }

    let rest = literal[open[0].len()..].trim_end();
    let close = format!("</{}>", &open[1]);
    let inner = rest.strip_suffix(close.as_str()).unwrap_or(rest);

    let inner = inner.trim_matches('\n');
    if inner.trim().is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Remove depth-2 table-of-contents headings and the list right after them.
fn strip_toc<'a>(root: &'a AstNode<'a>) {
    let headings: Vec<_> = root.children().filter(|node| is_toc_heading(node)).collect();

    for heading in headings {
        if let Some(next) = heading.next_sibling() {
            if matches!(next.data.borrow().value, NodeValue::List(_)) {
                next.detach();
            }
        }
        heading.detach();
    }
}

fn is_toc_heading<'a>(node: &'a AstNode<'a>) -> bool {
    let level = match node.data.borrow().value {
        NodeValue::Heading(ref heading) => heading.level,
        _ => return false,
    };
    level == 2 && toc_regex().is_match(heading_text(node).trim())
}

/// Text of the direct text children only; emphasis and code are skipped.
fn heading_text<'a>(node: &'a AstNode<'a>) -> String {
    node.children()
        .filter_map(|child| match &child.data.borrow().value {
            NodeValue::Text(value) => Some(value.clone()),
            _ => None,
        })
        .collect()
}

/// Remove top-level MDX ESM statements, which markdown parses as paragraphs.
///
/// A statement continues over blank lines until its brackets balance, so
/// the paragraphs that follow an unbalanced one are removed with it.
fn strip_esm<'a>(root: &'a AstNode<'a>) {
    let mut statements = Vec::new();
    let mut node = root.first_child();

    while let Some(current) = node {
        node = current.next_sibling();

        let text = plain_text(current);
        let is_statement = matches!(current.data.borrow().value, NodeValue::Paragraph)
            && esm_regex().is_match(&text);
        if !is_statement {
            continue;
        }

        statements.push(current);
        let mut depth = bracket_depth(&text);
        while depth > 0 {
            let Some(continuation) = node else { break };
            depth += bracket_depth(&plain_text(continuation));
            statements.push(continuation);
            node = continuation.next_sibling();
        }
    }

    for statement in statements {
        statement.detach();
    }
}

/// Net count of opening over closing brackets.
fn bracket_depth(text: &str) -> i64 {
    text.chars().fold(0, |depth, c| match c {
        '{' | '[' | '(' => depth + 1,
        '}' | ']' | ')' => depth - 1,
        _ => depth,
    })
}

fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(value) => text.push_str(value),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// Inline HTML and JSX tags are dropped; the text around them stays.
fn strip_inline_html<'a>(root: &'a AstNode<'a>) {
    let tags: Vec<_> = root
        .descendants()
        .filter(|node| matches!(node.data.borrow().value, NodeValue::HtmlInline(_)))
        .collect();

    for tag in tags {
        tag.detach();
    }
}

/// Resolve every link target against `base`.
///
/// A link whose target cannot be resolved keeps its content inside an
/// `<a>` without `href`.
fn rewrite_links<'a>(arena: &'a Arena<AstNode<'a>>, root: &'a AstNode<'a>, base: &str) {
    let mut broken = Vec::new();

    for node in root.descendants() {
        if let NodeValue::Link(ref mut link) = node.data.borrow_mut().value {
            match create_url(&link.url, base) {
                Some(url) => link.url = url,
                None => broken.push(node),
            }
        }
    }

    for link in broken {
        link.insert_before(raw_inline(arena, "<a>"));
        splice_before(link, link);
        link.insert_before(raw_inline(arena, "</a>"));
        link.detach();
    }
}
