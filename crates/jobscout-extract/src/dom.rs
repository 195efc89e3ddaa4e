//! Small helpers over the parsed document tree.

use sws_scraper::{ElementRef, Html, Node, Selector};
use sws_tree::iter::Edge;

use crate::text::normalize;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Clone, Copy)]
enum Kind {
    Block,
    Hidden,
    Inline,
}

fn kind_of(node: &Node) -> Option<Kind> {
    match node {
        Node::Element(e) if HIDDEN_TAGS.contains(&e.name()) => Some(Kind::Hidden),
        Node::Element(e) if BLOCK_TAGS.contains(&e.name()) => Some(Kind::Block),
        Node::Element(_) => Some(Kind::Inline),
        _ => None,
    }
}

/// Visible text of an element, whitespace-normalized.
///
/// Block boundaries become spaces so `<li>A</li><li>B</li>` reads `A B`;
/// inline markup is concatenated as is. Script and style content is skipped.
pub fn flat_text(element: &ElementRef) -> String {
    let mut raw = String::new();
    let mut hidden_depth = 0usize;

    for edge in element.traverse() {
        match edge {
            Edge::Open(node) => {
                node.map_value(|v| match (v, kind_of(v)) {
                    (_, Some(Kind::Hidden)) => hidden_depth += 1,
                    (_, Some(Kind::Block)) => raw.push(' '),
                    (Node::Text(text), _) if hidden_depth == 0 => raw.push_str(text),
                    _ => (),
                });
            }
            Edge::Close(node) => {
                node.map_value(|v| match kind_of(v) {
                    Some(Kind::Hidden) => hidden_depth = hidden_depth.saturating_sub(1),
                    Some(Kind::Block) => raw.push(' '),
                    _ => (),
                });
            }
        }
    }

    normalize(&raw)
}

/// Raw text content, as found in `<script>` bodies.
pub fn raw_text(element: &ElementRef) -> String {
    element.inner_text()
}

/// Removes the markup of an HTML snippet, keeping its visible text.
pub fn strip_tags(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return normalize(html);
    }
    flat_text(&Html::parse_fragment(html).root_element())
}

pub fn attr(element: &ElementRef, name: &str) -> Option<String> {
    element
        .map_value(|e| e.attr(name).map(str::to_string))
        .flatten()
}

pub fn is_tag(element: &ElementRef, name: &str) -> bool {
    element.map_value(|e| e.name() == name).unwrap_or(false)
}

/// Detaches every element matching `selector`, returns how many were removed.
pub fn remove_all(document: &Html, selector: &Selector) -> usize {
    let matches = document.select(selector.clone()).collect::<Vec<_>>();
    for element in &matches {
        let mut node = (**element).clone();
        node.detach();
    }
    matches.len()
}
