//! Structural walker and the span tree built on top of it.
//!
//! The walker finds top-level occurrences of one tag name within a span,
//! tracking depth only for that name. Malformed nesting ends the walk
//! instead of failing: the caller just sees fewer elements.

use super::scanner::{find_close_tag, find_open_tag, read_tag, Tag};
use crate::models::CategoryIcon;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    /// Between the opening and closing tags. Empty (at `tag.span.end`) when self-closing.
    pub inner: Range<usize>,
    /// Opening tag through closing tag
    pub span: Range<usize>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.tag.attrs.get(name)
    }

    pub fn is_self_closing(&self) -> bool {
        self.tag.self_closing
    }
}

/// Top-level `name` elements inside `span`, in document order.
pub fn top_level_elements(text: &str, span: Range<usize>, name: &str) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut cursor = span.start;

    while let Some(start) = find_open_tag(text, cursor, span.end, name) {
        let Some(open) = read_tag(text, start, span.end) else { break };

        if open.self_closing {
            cursor = open.span.end;
            elements.push(Element {
                inner: open.span.end..open.span.end,
                span: open.span.clone(),
                tag: open,
            });
            continue;
        }

        match matching_close(text, open.span.end, span.end, name) {
            Some(close) => {
                cursor = close.end;
                elements.push(Element {
                    inner: open.span.end..close.start,
                    span: open.span.start..close.end,
                    tag: open,
                });
            }
            None => {
                log::debug!("Unmatched <{}> at offset {}, stopping walk", name, start);
                break;
            }
        }
    }

    elements
}

/// First top-level `name` element inside `span`.
pub fn find_element(text: &str, span: Range<usize>, name: &str) -> Option<Element> {
    top_level_elements(text, span, name).into_iter().next()
}

/// Closing tag that balances an opening tag ending at `from`.
fn matching_close(text: &str, from: usize, end: usize, name: &str) -> Option<Range<usize>> {
    let mut depth = 1usize;
    let mut cursor = from;

    loop {
        let close = find_close_tag(text, cursor, end, name)?;
        match find_open_tag(text, cursor, close.start, name) {
            Some(nested_start) => {
                let nested = read_tag(text, nested_start, end)?;
                if !nested.self_closing {
                    depth += 1;
                }
                cursor = nested.span.end;
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some(close);
                }
                cursor = close.end;
            }
        }
    }
}

/// A `<Sound id="N"/>` reference inside a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundRef {
    /// `None` when the id is not a number
    pub id: Option<usize>,
    pub element: Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub element: Element,
    pub name: String,
    pub hidden: bool,
    pub icon: Option<String>,
    /// Direct references only, sub-category sounds excluded
    pub sounds: Vec<SoundRef>,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    pub fn icon(&self) -> Option<CategoryIcon> {
        self.icon.as_deref().and_then(CategoryIcon::classify)
    }

    /// Named and not hidden.
    pub fn is_visible(&self) -> bool {
        !self.hidden && !self.name.is_empty()
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a CategoryNode>, skip_hidden: bool) {
        if skip_hidden && self.hidden {
            return;
        }
        out.push(self);
        for child in &self.children {
            child.collect(out, skip_hidden);
        }
    }
}

/// Categories in document (pre-)order. With `skip_hidden`, hidden categories
/// and everything beneath them are left out.
pub fn preorder(roots: &[CategoryNode], skip_hidden: bool) -> Vec<&CategoryNode> {
    let mut out = Vec::new();
    for root in roots {
        root.collect(&mut out, skip_hidden);
    }
    out
}

/// Build the category tree found directly inside `span`.
pub fn category_tree(text: &str, span: Range<usize>) -> Vec<CategoryNode> {
    top_level_elements(text, span, "Category")
        .into_iter()
        .map(|element| build_node(text, element))
        .collect()
}

fn build_node(text: &str, element: Element) -> CategoryNode {
    let children = category_tree(text, element.inner.clone());

    let sounds = top_level_elements(text, element.inner.clone(), "Sound")
        .into_iter()
        .filter(|s| {
            !children
                .iter()
                .any(|c| c.element.span.start <= s.span.start && s.span.end <= c.element.span.end)
        })
        .filter(|s| s.attr("id").is_some())
        .map(|s| SoundRef {
            id: s.attr("id").and_then(|v| v.trim().parse().ok()),
            element: s,
        })
        .collect();

    CategoryNode {
        name: element.attr("name").unwrap_or_default().to_string(),
        hidden: element
            .attr("hidden")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        icon: element
            .attr("icon")
            .or_else(|| element.attr("image"))
            .map(str::to_string),
        sounds,
        children,
        element,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(elements: &[Element]) -> Vec<String> {
        elements
            .iter()
            .map(|e| e.attr("name").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn only_top_level_occurrences() {
        let text = r#"<Category name="A"><Category name="B"/></Category><Category name="C"/>"#;
        let top = top_level_elements(text, 0..text.len(), "Category");
        assert_eq!(names(&top), vec!["A", "C"]);

        let inside_a = top_level_elements(text, top[0].inner.clone(), "Category");
        assert_eq!(names(&inside_a), vec!["B"]);
        assert!(top[1].is_self_closing());
        assert!(top[1].inner.is_empty());
    }

    #[test]
    fn nested_paired_elements_balance() {
        let text = concat!(
            r#"<Category name="A"><Category name="B"><Category name="B2"></Category></Category>"#,
            r#"<Category name="D"/></Category><Category name="C"></Category>"#
        );
        let top = top_level_elements(text, 0..text.len(), "Category");
        assert_eq!(names(&top), vec!["A", "C"]);
        assert!(text[top[0].span.clone()].ends_with(r#"<Category name="D"/></Category>"#));
    }

    #[test]
    fn unmatched_nesting_stops_quietly() {
        let text = r#"<Category name="A"/><Category name="B"><Category name="C"></Category>"#;
        let top = top_level_elements(text, 0..text.len(), "Category");
        assert_eq!(names(&top), vec!["A"]);
    }

    #[test]
    fn tree_separates_direct_and_nested_sounds() {
        let text = concat!(
            r#"<Category name="Parent" icon="star">"#,
            r#"<Sound id="4"/>"#,
            r#"<Category name="SubA"><Sound id="0"/><Sound id="2"/></Category>"#,
            r#"<Sound id="5"/>"#,
            r#"</Category>"#,
            r#"<Category name="System" hidden="true"><Sound id="1"/></Category>"#
        );
        let tree = category_tree(text, 0..text.len());
        assert_eq!(tree.len(), 2);

        let parent = &tree[0];
        let direct: Vec<_> = parent.sounds.iter().map(|s| s.id).collect();
        assert_eq!(direct, vec![Some(4), Some(5)]);
        assert_eq!(parent.children[0].sounds.len(), 2);
        assert_eq!(parent.icon(), Some(CategoryIcon::Named("star".into())));

        assert!(tree[1].hidden);
        assert_eq!(preorder(&tree, false).len(), 3);
        let visible: Vec<_> = preorder(&tree, true).iter().map(|c| c.name.clone()).collect();
        assert_eq!(visible, vec!["Parent", "SubA"]);
    }
}
