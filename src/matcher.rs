use scraper::{node::Node, ElementRef};

use crate::cleaner::TextCleaner;

/// Predicate deciding whether an element is a value node.
pub trait Matcher {
    fn matches(&self, element: &ElementRef) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&ElementRef) -> bool,
{
    fn matches(&self, element: &ElementRef) -> bool {
        self(element)
    }
}

/// Matches the value node of one label in a two-column row layout:
///
/// ```text
/// <tr>
///   <td><b>Event Name:</b></td>     <- label cell, first child holds the label
///   <td><font>Spring Mixer</font></td>  <- matched node
/// </tr>
/// ```
pub struct LabelMatcher<'s> {
    label: &'s str,
    value_tag: &'s str,
    cleaner: &'s dyn TextCleaner,
}

impl<'s> LabelMatcher<'s> {
    pub fn new(label: &'s str, value_tag: &'s str, cleaner: &'s dyn TextCleaner) -> Self {
        LabelMatcher {
            label,
            value_tag,
            cleaner,
        }
    }

    pub fn label(&self) -> &str {
        self.label
    }
}

impl Matcher for LabelMatcher<'_> {
    fn matches(&self, element: &ElementRef) -> bool {
        if !element.value().name().eq_ignore_ascii_case(self.value_tag) {
            return false;
        }
        let Some(parent) = element.parent() else {
            return false;
        };
        if parent.parent().is_none() {
            return false;
        }

        let label_cell = parent.prev_siblings().find(|sibling| !is_blank_text(sibling.value()));
        match label_cell.and_then(|cell| cell.first_child()) {
            Some(first) => {
                let mut fragments = first
                    .descendants()
                    .filter_map(|node| node.value().as_text())
                    .map(|text| &**text);
                self.cleaner
                    .clean_fragments(&mut fragments)
                    .contains(self.label)
            }
            None => false,
        }
    }
}

// Inter-cell whitespace survives parsing as text nodes
pub(crate) fn is_blank_text(node: &Node) -> bool {
    node.as_text().map_or(false, |text| text.trim().is_empty())
}

/// Collects every element under `root` (inclusive) accepted by `matcher`,
/// in document order. The subtree of a match is not searched.
pub fn find_all<'a, M: Matcher + ?Sized>(root: ElementRef<'a>, matcher: &M) -> Vec<ElementRef<'a>> {
    let mut matches = Vec::new();
    collect(root, matcher, &mut matches);
    matches
}

fn collect<'a, M: Matcher + ?Sized>(element: ElementRef<'a>, matcher: &M, out: &mut Vec<ElementRef<'a>>) {
    if matcher.matches(&element) {
        out.push(element);
        return;
    }
    for child in element.children().filter_map(ElementRef::wrap) {
        collect(child, matcher, out);
    }
}
