// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property paths from the snapshot root to the value being processed.
//!
//! Rendered as `$.tasks[2].action.next`. Map values are rendered as
//! `{key}` when the key is a string and `{#n}` otherwise.

use std::fmt;
use std::rc::Rc;

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Element(usize),
    MapKey(usize),
    MapValue(MapKeyLabel),
}

/// How a map value's key appears in a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapKeyLabel {
    Named(String),
    Index(usize),
}

/// Immutable, shareable property path (a parent-linked list).
#[derive(Debug)]
pub struct PropertyTrace {
    segment: Option<Segment>,
    parent: Option<Rc<PropertyTrace>>,
}

impl PropertyTrace {
    /// The root path, `$`.
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            segment: None,
            parent: None,
        })
    }

    /// Extend `parent` by one segment.
    pub fn child(parent: &Rc<Self>, segment: Segment) -> Rc<Self> {
        Rc::new(Self {
            segment: Some(segment),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn field(parent: &Rc<Self>, name: impl Into<String>) -> Rc<Self> {
        Self::child(parent, Segment::Field(name.into()))
    }

    pub fn element(parent: &Rc<Self>, index: usize) -> Rc<Self> {
        Self::child(parent, Segment::Element(index))
    }

    /// Number of segments from the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self;
        while let Some(parent) = node.parent.as_deref() {
            depth += 1;
            node = parent;
        }
        depth
    }
}

impl fmt::Display for PropertyTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = Vec::new();
        let mut node = Some(self);
        while let Some(current) = node {
            if let Some(segment) = &current.segment {
                segments.push(segment);
            }
            node = current.parent.as_deref();
        }

        f.write_str("$")?;
        for segment in segments.into_iter().rev() {
            match segment {
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Element(index) => write!(f, "[{index}]")?,
                Segment::MapKey(index) => write!(f, "<key #{index}>")?,
                Segment::MapValue(MapKeyLabel::Named(key)) => write!(f, "{{{key}}}")?,
                Segment::MapValue(MapKeyLabel::Index(index)) => write!(f, "{{#{index}}}")?,
            }
        }
        Ok(())
    }
}

// Deep paths form long parent chains; unlink them iteratively.
impl Drop for PropertyTrace {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            match Rc::try_unwrap(node) {
                Ok(mut inner) => parent = inner.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mixed_path() {
        let root = PropertyTrace::root();
        let tasks = PropertyTrace::field(&root, "tasks");
        let second = PropertyTrace::element(&tasks, 2);
        let action = PropertyTrace::field(&second, "action");
        let value = PropertyTrace::child(&action, Segment::MapValue(MapKeyLabel::Named("mode".into())));

        assert_eq!(root.to_string(), "$");
        assert_eq!(action.to_string(), "$.tasks[2].action");
        assert_eq!(value.to_string(), "$.tasks[2].action{mode}");
        assert_eq!(value.depth(), 4);
    }

    #[test]
    fn test_deep_path_renders_and_drops() {
        let mut trace = PropertyTrace::root();
        for _ in 0..200_000 {
            trace = PropertyTrace::field(&trace, "next");
        }
        assert_eq!(trace.depth(), 200_000);
        assert!(trace.to_string().ends_with(".next.next"));
        drop(trace);
    }
}
