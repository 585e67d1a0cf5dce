//! Segment-keyed prefix tree shared by the route and filter mappers.
//!
//! Each node owns its literal children, at most one parametric child and at
//! most one wildcard child, plus a payload slot. The route mapper stores one
//! handler per method in the payload; the filter mapper stores a list of
//! bindings. A node may hold a parametric and a wildcard child at once.
//!
//! The tree is only mutated while registering. Lookups walk it through shared
//! references and keep their bindings in call-local accumulators, so a built
//! tree can be read from many threads without locking.

use std::collections::HashMap;

use crate::path::{PathPattern, Segment};
use crate::segment::ParamSegment;

/// How a parametric segment is reconciled with the one already installed at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamPolicy {
    /// Name and matcher kind must agree (single-winner route matching).
    Strict,
    /// Any parametric segment shares the node (multi-winner filter matching).
    Shared,
}

/// A parametric segment disagreeing with the one installed at its position.
#[derive(Debug, Clone)]
pub struct ParamConflict {
    /// The segment already installed.
    pub existing: ParamSegment,
    /// Pattern that installed it.
    pub existing_pattern: String,
    /// The rejected segment.
    pub requested: ParamSegment,
}

#[derive(Debug)]
struct ParamChild<P> {
    segment: ParamSegment,
    origin: String,
    node: PathTree<P>,
}

/// A node of the segment trie.
#[derive(Debug)]
pub struct PathTree<P> {
    literals: HashMap<String, PathTree<P>>,
    param: Option<Box<ParamChild<P>>>,
    wildcard: Option<Box<PathTree<P>>>,
    payload: P,
}

impl<P: Default> Default for PathTree<P> {
    fn default() -> Self {
        Self {
            literals: HashMap::new(),
            param: None,
            wildcard: None,
            payload: P::default(),
        }
    }
}

impl<P: Default> PathTree<P> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `pattern` from this node, creating missing nodes, and returns
    /// the node where the pattern ends.
    ///
    /// # Errors
    ///
    /// Under [`ParamPolicy::Strict`], returns [`ParamConflict`] when a
    /// parametric segment differs in name or matcher kind from the one
    /// already installed at the same position.
    pub fn node_mut(
        &mut self,
        pattern: &PathPattern,
        policy: ParamPolicy,
    ) -> Result<&mut Self, ParamConflict> {
        let mut node = self;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Static(literal) => node.literals.entry(literal.clone()).or_default(),
                Segment::Param(param) => node.param_child_mut(param, pattern.as_str(), policy)?,
                Segment::Wildcard => &mut **node.wildcard.get_or_insert_with(Box::default),
            };
        }
        Ok(node)
    }

    /// [`Self::node_mut`] under [`ParamPolicy::Shared`], which never conflicts.
    pub fn shared_node_mut(&mut self, pattern: &PathPattern) -> &mut Self {
        match self.node_mut(pattern, ParamPolicy::Shared) {
            Ok(node) => node,
            Err(_) => unreachable!("shared parametric children never conflict"),
        }
    }

    fn param_child_mut(
        &mut self,
        param: &ParamSegment,
        origin: &str,
        policy: ParamPolicy,
    ) -> Result<&mut Self, ParamConflict> {
        let child = self.param.get_or_insert_with(|| {
            Box::new(ParamChild {
                segment: param.clone(),
                origin: origin.to_string(),
                node: Self::default(),
            })
        });

        if policy == ParamPolicy::Strict && !child.segment.same_shape(param) {
            return Err(ParamConflict {
                existing: child.segment.clone(),
                existing_pattern: child.origin.clone(),
                requested: param.clone(),
            });
        }

        Ok(&mut child.node)
    }
}

impl<P> PathTree<P> {
    /// Returns the literal child for `segment`.
    #[must_use]
    pub fn literal(&self, segment: &str) -> Option<&Self> {
        self.literals.get(segment)
    }

    /// Returns the parametric child and its segment definition.
    #[must_use]
    pub fn parametric(&self) -> Option<(&ParamSegment, &Self)> {
        self.param.as_deref().map(|c| (&c.segment, &c.node))
    }

    /// Returns the wildcard child.
    #[must_use]
    pub fn wildcard(&self) -> Option<&Self> {
        self.wildcard.as_deref()
    }

    /// Returns the payload stored at this node.
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Returns the payload stored at this node, mutably.
    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Returns the number of nodes in this subtree, including this one.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.literals.values().map(Self::node_count).sum::<usize>()
            + self.parametric().map_or(0, |(_, n)| n.node_count())
            + self.wildcard().map_or(0, Self::node_count)
    }
}
