//! Commented-markup extraction.
//!
//! The reference site wraps some tables and the shot chart in HTML
//! comments so that naive scrapers only see an empty container. The
//! comment text is itself valid markup and is re-parsed as a document.

use scraper::{Html, Node};

/// Anchor for the hidden shot-chart block.
pub const SHOT_CHART_ANCHOR: &str = r#"id="div_shot-chart""#;

/// Anchor for the container the site wraps around a table with `table_id`.
pub fn container_anchor(table_id: &str) -> String {
    format!(r#"id="div_{table_id}""#)
}

/// Return the text of the first comment node (depth-first, pre-order)
/// containing `anchor`, or `None` when there is none.
pub fn find_commented_markup(document: &Html, anchor: &str) -> Option<String> {
    // Children are pushed in reverse so the leftmost child is visited next.
    let mut stack = vec![document.tree.root()];
    while let Some(node) = stack.pop() {
        if let Node::Comment(comment) = node.value() {
            if comment.contains(anchor) {
                return Some(String::from(&**comment));
            }
        }
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Parse `html` and extract the anchored comment from it.
pub fn extract_commented_markup(html: &str, anchor: &str) -> Option<String> {
    let document = Html::parse_document(html);
    find_commented_markup(&document, anchor)
}
