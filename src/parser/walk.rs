//! Depth-first traversal over a parsed document.
//!
//! Every extractor in this crate is a [`Matcher`] handed to [`traverse`],
//! followed by a little post-processing of the nodes it kept.

use html_scraper::ElementRef;

/// What a [`Matcher`] decided about a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// Include the element in the traversal output.
    pub keep: bool,
    /// Visit the element's children.
    pub descend: bool,
}

impl Visit {
    /// Not interesting, but its children might be.
    pub const SKIP: Visit = Visit {
        keep: false,
        descend: true,
    };
    /// Keep it and keep looking underneath it.
    pub const KEEP: Visit = Visit {
        keep: true,
        descend: true,
    };
    /// Keep it and don't look underneath it.
    pub const STOP: Visit = Visit {
        keep: true,
        descend: false,
    };
}

/// Decides, per element, whether to keep it and whether to descend into it.
pub trait Matcher {
    fn visit(&self, node: ElementRef<'_>) -> Visit;
}

impl<M: Matcher + ?Sized> Matcher for &M {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        (**self).visit(node)
    }
}

/// Pre-order, depth-first walk starting at (and including) `root`.
///
/// Only element nodes are offered to the matcher. The tree is never mutated.
pub fn traverse<'a, M: Matcher + ?Sized>(root: ElementRef<'a>, matcher: &M) -> Vec<ElementRef<'a>> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let visit = matcher.visit(node);
        if visit.keep {
            found.push(node);
        }
        if visit.descend {
            let children: Vec<_> = node.children().filter_map(ElementRef::wrap).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    found
}

/// The first non-blank text node under `node`, trimmed.
pub fn first_text<'a>(node: ElementRef<'a>) -> Option<&'a str> {
    node.text().map(str::trim).find(|t| !t.is_empty())
}

/// All text under `node` with runs of whitespace collapsed to single spaces.
pub fn collapsed_text(node: ElementRef<'_>) -> String {
    node.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
