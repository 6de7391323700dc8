//! Small named predicates that extractors compose into matchers.

use super::walk::{Matcher, Visit};
use html_scraper::ElementRef;

/// Elements with the given tag name.
#[derive(Debug, Clone, Copy)]
pub struct ByTag(pub &'static str);

impl Matcher for ByTag {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        if node.value().name() == self.0 {
            Visit::KEEP
        } else {
            Visit::SKIP
        }
    }
}

/// Elements whose attribute `name` equals `value` exactly.
#[derive(Debug, Clone, Copy)]
pub struct ByAttribute {
    pub name: &'static str,
    pub value: &'static str,
}

impl ByAttribute {
    pub fn new(name: &'static str, value: &'static str) -> Self {
        Self { name, value }
    }
}

impl Matcher for ByAttribute {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        if node.value().attr(self.name) == Some(self.value) {
            Visit::KEEP
        } else {
            Visit::SKIP
        }
    }
}

/// Elements carrying the attribute at all, whatever its value (`<option selected>`).
#[derive(Debug, Clone, Copy)]
pub struct HasAttribute(pub &'static str);

impl Matcher for HasAttribute {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        if node.value().attr(self.0).is_some() {
            Visit::KEEP
        } else {
            Visit::SKIP
        }
    }
}

/// Elements whose attribute is present and not blank after trimming.
#[derive(Debug, Clone, Copy)]
pub struct NonBlankAttribute(pub &'static str);

impl Matcher for NonBlankAttribute {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        match node.value().attr(self.0) {
            Some(value) if !value.trim().is_empty() => Visit::KEEP,
            _ => Visit::SKIP,
        }
    }
}

/// Keeps a node only if both matchers keep it; descends only if both descend.
#[derive(Debug, Clone, Copy)]
pub struct And<A, B>(pub A, pub B);

impl<A: Matcher, B: Matcher> Matcher for And<A, B> {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        let a = self.0.visit(node);
        let b = self.1.visit(node);
        Visit {
            keep: a.keep && b.keep,
            descend: a.descend && b.descend,
        }
    }
}

/// Stops descending at every node the inner matcher keeps.
#[derive(Debug, Clone, Copy)]
pub struct StopAt<M>(pub M);

impl<M: Matcher> Matcher for StopAt<M> {
    fn visit(&self, node: ElementRef<'_>) -> Visit {
        let inner = self.0.visit(node);
        if inner.keep {
            Visit::STOP
        } else {
            inner
        }
    }
}
