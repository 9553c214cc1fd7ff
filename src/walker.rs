//! Depth-first walk over the parts of a message

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tracing::{Dispatch, debug, debug_span};

use crate::config::WalkConfig;
use crate::entity::{Entity, parse_message};
use crate::error::{BoxError, Result, WalkError};
use crate::filename::{self, FILE_NAME_KEY};
use crate::part::{ContentType, Part, keep_bad_input};

/// What a visitor returns: `Break` ends the walk early without an error.
pub type VisitResult = std::result::Result<ControlFlow<()>, BoxError>;

/// Role of a node in an [`Outline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The part the walk started from
    Root,
    /// Multipart with a boundary; never handed to the visitor
    Container,
    /// Handed to the visitor
    Leaf,
}

/// Tree-position record of one part seen during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub seq: u64,
    pub parent: Option<u64>,
    pub depth: usize,
    /// Child indexes from the top-level entity; empty for it and the root
    pub path: Vec<usize>,
    pub kind: NodeKind,
    pub media_type: String,
    pub file_name: Option<String>,
    pub digest: Option<String>,
}

/// Arena of the nodes of one walk, in visiting order.
///
/// Sequence numbers grow in visiting order, so nodes are also sorted by
/// `seq` and parent links resolve by binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    nodes: Vec<Node>,
}

impl Outline {
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn get(&self, seq: u64) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&seq, |n| n.seq)
            .ok()
            .map(|i| &self.nodes[i])
    }

    #[must_use]
    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent.and_then(|seq| self.get(seq))
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Leaf)
    }

    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn push(&mut self, part: &Part<'_>, path: &[usize], kind: NodeKind) {
        self.nodes.push(Node {
            seq: part.seq,
            parent: part.parent,
            depth: part.depth,
            path: path.to_vec(),
            kind,
            media_type: part.media_type.clone(),
            file_name: part.file_name.clone(),
            digest: part.digest().map(str::to_string),
        });
    }
}

/// Walks message trees with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    config: WalkConfig,
    dispatch: Option<Dispatch>,
}

impl Walker {
    #[must_use]
    pub const fn new(config: WalkConfig) -> Self {
        Self {
            config,
            dispatch: None,
        }
    }

    /// Sends this walker's log events to `dispatch` instead of the global
    /// subscriber.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Calls `visit` once for every non-container part under `root`, in
    /// depth-first pre-order.
    ///
    /// Multiparts with a boundary are not handed to `visit`; their children
    /// are. With `stop_at_top_level`, multiparts nested directly below the
    /// top-level entity are handed over whole instead of being descended
    /// into. Each visited part carries its sanitized file name in
    /// [`FILE_NAME_KEY`].
    ///
    /// Returning `ControlFlow::Break` from `visit` ends the walk
    /// successfully. Any error ends it with that error; calls already made
    /// are not undone.
    pub fn walk<'a, F>(
        &self,
        root: &Part<'a>,
        stop_at_top_level: bool,
        mut visit: F,
    ) -> Result<Outline>
    where
        F: FnMut(&Part<'a>) -> VisitResult,
    {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || {
                self.walk_root(root, stop_at_top_level, &mut visit)
            }),
            None => self.walk_root(root, stop_at_top_level, &mut visit),
        }
    }

    fn walk_root<'a, F>(
        &self,
        root: &Part<'a>,
        stop_at_top_level: bool,
        visit: &mut F,
    ) -> Result<Outline>
    where
        F: FnMut(&Part<'a>) -> VisitResult,
    {
        let _span = debug_span!("walk", seq = root.seq).entered();
        let entity = root
            .entity()
            .ok_or_else(|| WalkError::MissingEntity(root.to_string()))?;

        let mut walk = Walk {
            config: &self.config,
            stop_at_top_level,
            outline: Outline::default(),
            path: Vec::new(),
            visit,
        };
        walk.outline.push(root, &[], NodeKind::Root);
        if walk.entity(root, entity)?.is_break() {
            debug!(parts = walk.outline.len(), "walk stopped early");
        } else {
            debug!(parts = walk.outline.len(), "walk finished");
        }
        Ok(walk.outline)
    }
}

/// Parses `raw`, stamps the whole-message digest on a fresh root part and
/// walks it with `config`.
pub fn walk_message<F>(
    raw: &[u8],
    config: &WalkConfig,
    stop_at_top_level: bool,
    visit: F,
) -> Result<Outline>
where
    F: FnMut(&Part<'_>) -> VisitResult,
{
    let parsed = parse_message(raw)?;
    let root = Part::root().with_entity(Entity::new(&parsed), config)?;
    Walker::new(config.clone()).walk(&root, stop_at_top_level, visit)
}

struct Walk<'w, F> {
    config: &'w WalkConfig,
    stop_at_top_level: bool,
    outline: Outline,
    path: Vec<usize>,
    visit: &'w mut F,
}

impl<'a, F> Walk<'_, F>
where
    F: FnMut(&Part<'a>) -> VisitResult,
{
    fn entity(&mut self, parent: &Part<'_>, entity: Entity<'a>) -> Result<ControlFlow<()>> {
        let child = parent.spawn();
        if self.path.len() >= self.config.max_depth {
            return Err(WalkError::TooDeep {
                part: child.to_string(),
                depth: self.path.len() + 1,
                max: self.config.max_depth,
            });
        }

        let declared = entity.content_type_header();
        let ctype = match ContentType::parse(declared.as_deref()) {
            Ok(ctype) => ctype,
            Err(value) => {
                keep_bad_input(entity, self.config);
                return Err(WalkError::ContentType {
                    part: child.to_string(),
                    value,
                });
            }
        };
        debug!(path = ?self.path, media_type = %ctype.media_type, params = ?ctype.params, "entity");

        let descend = !(self.stop_at_top_level && self.path.len() == 1);
        if ctype.is_container() && descend {
            debug!(path = ?self.path, media_type = %ctype.media_type, "skip container");
            let mut container = child;
            container.media_type = ctype.media_type;
            container.media_params = ctype.params;
            self.outline.push(&container, &self.path, NodeKind::Container);
            for (i, sub) in entity.children().enumerate() {
                self.path.push(i);
                let flow = self.entity(&container, sub);
                self.path.pop();
                if flow?.is_break() {
                    return Ok(ControlFlow::Break(()));
                }
            }
            return Ok(ControlFlow::Continue(()));
        }

        let mut part = child.with_entity(entity, self.config)?;
        let name = part
            .declared_file_name()
            .unwrap_or_else(|| filename::synthesize(part.depth, part.seq, &part.media_type));
        let safe = filename::sanitize(&name, true);
        part.header.add(FILE_NAME_KEY, safe.clone());
        part.file_name = Some(safe);
        self.outline.push(&part, &self.path, NodeKind::Leaf);

        match (self.visit)(&part) {
            Ok(ControlFlow::Continue(())) => Ok(ControlFlow::Continue(())),
            Ok(ControlFlow::Break(())) => {
                debug!(file_name = %name, "visitor stopped the walk");
                Ok(ControlFlow::Break(()))
            }
            Err(source) => Err(WalkError::Visitor {
                file_name: name,
                source,
            }),
        }
    }
}
