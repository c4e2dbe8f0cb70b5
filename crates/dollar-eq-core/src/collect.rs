//! Worklist collection over the host's content tree.
//!
//! The host document is only reachable through [`ContentTree`]. Collection
//! walks the root containers, filters out text that can't or shouldn't be
//! converted and produces an ordered [`Worklist`]. Locations never cache
//! offsets: [`live_span`] re-derives the span when the location is visited.

use std::fmt;

use smol_str::SmolStr;

use crate::scan::{Span, first_span, scan};

/// Read access to the host document.
///
/// `Node` is an opaque handle compared by identity. For DOM hosts this is a
/// `web_sys::Node`; tests use plain ids.
pub trait ContentTree {
    type Node: Clone + PartialEq + fmt::Debug;

    /// All elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<Self::Node>;

    /// Fallback root when no selector matches.
    fn document_root(&self) -> Option<Self::Node>;

    /// Whether `node` is `ancestor` or lies beneath it.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;

    /// Text leaves beneath `root`, in document order.
    fn text_leaves(&self, root: &Self::Node) -> Vec<Self::Node>;

    /// Editable block elements beneath `root`, in document order.
    fn editable_blocks(&self, root: &Self::Node) -> Vec<Self::Node>;

    /// The node's text: the value of a text leaf, the concatenated text of an
    /// element.
    fn text(&self, node: &Self::Node) -> String;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Eligibility facts about an element.
    fn context(&self, element: &Self::Node) -> NodeContext;

    /// Rendered inline equation tokens inside `block`.
    fn inline_equations(&self, block: &Self::Node) -> Vec<Self::Node>;

    /// Text of `block` with every inline equation token removed.
    fn text_outside_equations(&self, block: &Self::Node) -> String;

    /// Source of a rendered equation token, if the host exposes it.
    fn equation_source(&self, token: &Self::Node) -> Option<String>;
}

/// What the host knows about an element's surroundings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeContext {
    /// The element accepts user edits.
    pub editable: bool,
    /// The element sits in a code or verbatim context.
    pub code: bool,
    /// The element is (part of) an already rendered equation.
    pub math: bool,
}

impl NodeContext {
    pub fn is_eligible(&self) -> bool {
        self.editable && !self.code && !self.math
    }
}

/// How a location finds its span again at visit time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationHint {
    /// Take the first span anywhere in the container.
    Block,
    /// Take the first span in the leaf whose content matches.
    Span { inner: SmolStr },
}

/// One entry of a worklist.
#[derive(Clone, Debug, PartialEq)]
pub struct Location<N> {
    pub container: N,
    pub hint: LocationHint,
}

/// How finely a worklist splits the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Granularity {
    /// One location per span.
    PerSpan,
    /// One location per editable block; a visit converts the block's first
    /// remaining span.
    #[default]
    PerBlock,
}

/// The ordered locations of one run. Built once, never changed.
#[derive(Clone, Debug)]
pub struct Worklist<N> {
    items: Vec<Location<N>>,
}

impl<N> Worklist<N> {
    pub fn new(items: Vec<Location<N>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Location<N>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location<N>> {
        self.items.iter()
    }
}

impl<N> FromIterator<Location<N>> for Worklist<N> {
    fn from_iter<I: IntoIterator<Item = Location<N>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A span found in the live document.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveSpan<N> {
    /// The text leaf holding the span.
    pub leaf: N,
    /// The leaf's text at scan time. `span` offsets index into this.
    pub text: String,
    pub span: Span,
}

impl<N> LiveSpan<N> {
    pub fn inner(&self) -> &str {
        self.span.inner(&self.text)
    }
}

/// A whole block to be replaced by a block equation.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockItem<N> {
    pub block: N,
    /// Equation source to type into the host's equation input.
    pub equation: String,
    /// What the block held before conversion, for logging.
    pub original: String,
}

/// Resolve root containers for `selectors`.
///
/// Matches from every selector are merged, and roots nested inside another
/// root are dropped so each leaf is reached once, in document order. With
/// no match at all the document root is used.
pub fn resolve_roots<T: ContentTree>(tree: &T, selectors: &[&str]) -> Vec<T::Node> {
    let mut found: Vec<T::Node> = Vec::new();
    for selector in selectors {
        for node in tree.query_all(selector) {
            if !found.contains(&node) {
                found.push(node);
            }
        }
    }

    let roots: Vec<T::Node> = found
        .iter()
        .filter(|node| {
            !found
                .iter()
                .any(|other| other != *node && tree.contains(other, node))
        })
        .cloned()
        .collect();

    if roots.is_empty() {
        tree.document_root().into_iter().collect()
    } else {
        roots
    }
}

/// If `leaf` may hold convertible text, its parent element.
///
/// A leaf qualifies when it contains a `$` and its parent is editable and
/// not inside code or an existing equation.
pub fn eligible_parent<T: ContentTree>(tree: &T, leaf: &T::Node) -> Option<T::Node> {
    if !tree.text(leaf).contains('$') {
        return None;
    }
    let parent = tree.parent_element(leaf)?;
    tree.context(&parent).is_eligible().then_some(parent)
}

/// Build the inline-mode worklist.
pub fn collect_inline<T: ContentTree>(
    tree: &T,
    selectors: &[&str],
    granularity: Granularity,
) -> Worklist<T::Node> {
    let mut leaves: Vec<(T::Node, T::Node)> = Vec::new();
    for root in resolve_roots(tree, selectors) {
        for leaf in tree.text_leaves(&root) {
            if leaves.iter().any(|(seen, _)| *seen == leaf) {
                continue;
            }
            if let Some(parent) = eligible_parent(tree, &leaf) {
                leaves.push((leaf, parent));
            }
        }
    }

    let worklist: Worklist<T::Node> = match granularity {
        Granularity::PerBlock => {
            let mut blocks: Vec<T::Node> = Vec::new();
            for (_, parent) in leaves {
                if !blocks.contains(&parent) {
                    blocks.push(parent);
                }
            }
            blocks
                .into_iter()
                .map(|container| Location {
                    container,
                    hint: LocationHint::Block,
                })
                .collect()
        }
        Granularity::PerSpan => leaves
            .into_iter()
            .flat_map(|(leaf, _)| {
                let text = tree.text(&leaf);
                scan(&text)
                    .map(|span| Location {
                        container: leaf.clone(),
                        hint: LocationHint::Span {
                            inner: SmolStr::new(span.inner(&text)),
                        },
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
    };

    tracing::debug!(
        target: "dollar_eq::collect",
        items = worklist.len(),
        ?granularity,
        "collected inline worklist"
    );
    worklist
}

/// Re-derive the span a location points at, from the document as it is now.
///
/// `None` means the location has nothing left to convert.
pub fn live_span<T: ContentTree>(
    tree: &T,
    location: &Location<T::Node>,
) -> Option<LiveSpan<T::Node>> {
    match &location.hint {
        LocationHint::Block => tree
            .text_leaves(&location.container)
            .into_iter()
            .filter(|leaf| eligible_parent(tree, leaf).is_some())
            .find_map(|leaf| {
                let text = tree.text(&leaf);
                let span = first_span(&text)?;
                Some(LiveSpan { leaf, text, span })
            }),
        LocationHint::Span { inner } => {
            let leaf = location.container.clone();
            eligible_parent(tree, &leaf)?;
            let text = tree.text(&leaf);
            let span = scan(&text).find(|s| s.inner(&text) == inner.as_str())?;
            Some(LiveSpan { leaf, text, span })
        }
    }
}

/// Content of a block that is exactly one `$$...$$` on a single line.
pub fn display_equation(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("$$")?.strip_suffix("$$")?;
    if inner.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
        return None;
    }
    let inner = inner.trim();
    (!inner.is_empty()).then_some(inner)
}

/// Blocks consisting of a single `$$...$$` display equation.
pub fn collect_display_blocks<T: ContentTree>(
    tree: &T,
    selectors: &[&str],
) -> Vec<BlockItem<T::Node>> {
    let items: Vec<_> = candidate_blocks(tree, selectors)
        .into_iter()
        .filter_map(|block| {
            let text = tree.text(&block);
            let equation = display_equation(&text)?.to_string();
            Some(BlockItem {
                block,
                equation,
                original: text.trim().to_string(),
            })
        })
        .collect();

    tracing::debug!(target: "dollar_eq::collect", items = items.len(), "collected display blocks");
    items
}

/// Blocks holding exactly one rendered inline equation and nothing else.
pub fn collect_inline_equation_blocks<T: ContentTree>(
    tree: &T,
    selectors: &[&str],
) -> Vec<BlockItem<T::Node>> {
    let mut items = Vec::new();
    for block in candidate_blocks(tree, selectors) {
        let tokens = tree.inline_equations(&block);
        if tokens.len() != 1 {
            if tokens.len() > 1 {
                tracing::trace!(
                    target: "dollar_eq::collect",
                    tokens = tokens.len(),
                    "skipping block with several inline equations"
                );
            }
            continue;
        }

        let remaining = tree.text_outside_equations(&block);
        if !remaining.trim().is_empty() {
            tracing::trace!(
                target: "dollar_eq::collect",
                remaining = %remaining.trim(),
                "skipping block with other text"
            );
            continue;
        }

        let Some(equation) = tree
            .equation_source(&tokens[0])
            .filter(|src| !src.trim().is_empty())
        else {
            tracing::debug!(target: "dollar_eq::collect", "inline equation without source");
            continue;
        };

        items.push(BlockItem {
            block,
            equation,
            original: "Inline Equation".to_string(),
        });
    }

    tracing::debug!(target: "dollar_eq::collect", items = items.len(), "collected inline-equation blocks");
    items
}

/// Editable blocks under the roots that aren't code or rendered math.
fn candidate_blocks<T: ContentTree>(tree: &T, selectors: &[&str]) -> Vec<T::Node> {
    let mut blocks: Vec<T::Node> = Vec::new();
    for root in resolve_roots(tree, selectors) {
        for block in tree.editable_blocks(&root) {
            if blocks.contains(&block) || !tree.context(&block).is_eligible() {
                continue;
            }
            blocks.push(block);
        }
    }
    blocks
}
