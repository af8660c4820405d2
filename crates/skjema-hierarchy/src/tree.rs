use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use skjema_data::DataModelReference;
use skjema_models::ComponentType;

/// Handle into a [`NodeTree`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A component instance with every dynamic property resolved against the
/// data snapshot the tree was generated from.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedItem {
    pub component_type: ComponentType,
    /// Bindings rewritten into the node's row context, e.g.
    /// `Persons.Name` becomes `Persons[1].Name` on row 1.
    pub bindings: BTreeMap<String, DataModelReference>,
    pub required: bool,
    pub hidden: bool,
    pub read_only: bool,
    pub texts: BTreeMap<String, String>,
    pub show_validations: Option<Vec<String>>,
}

impl ResolvedItem {
    #[must_use]
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            component_type,
            bindings: BTreeMap::new(),
            required: false,
            hidden: false,
            read_only: false,
            texts: BTreeMap::new(),
            show_validations: None,
        }
    }

    #[must_use]
    pub fn simple_binding(&self) -> Option<&DataModelReference> {
        self.bindings.get("simpleBinding")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub base_id: String,
    pub indexed_id: String,
    pub page: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Row of the closest repeating ancestor this node belongs to.
    pub row_index: Option<usize>,
    /// The concrete data model row the node lives in, used to make
    /// unqualified `dataModel` lookups row-relative.
    pub data_model_location: Option<DataModelReference>,
    pub item: ResolvedItem,
}

impl Node {
    /// The expression identity of this node.
    #[must_use]
    pub fn eval_node(&self) -> skjema_expr::EvalNode {
        skjema_expr::EvalNode {
            indexed_id: Some(self.indexed_id.clone()),
            page: Some(self.page.clone()),
            data_model_location: self.data_model_location.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageEntry {
    pub name: String,
    /// In `settings.pages.order` or the dedicated pdf page.
    pub navigable: bool,
    pub hidden: bool,
    pub top_level: Vec<NodeId>,
}

/// The materialized hierarchy for one (layout set, form data) snapshot.
///
/// The arena is append-only and handed out behind `&`; any change to the
/// inputs produces a whole new tree rather than mutating this one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeTree {
    nodes: Vec<Node>,
    by_indexed_id: FxHashMap<String, NodeId>,
    pages: Vec<PageEntry>,
}

impl NodeTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        debug_assert!(self.nodes.len() < u32::MAX as usize);
        #[allow(clippy::cast_possible_truncation)]
        let id = NodeId(self.nodes.len() as u32);
        self.by_indexed_id.insert(node.indexed_id.clone(), id);
        self.nodes.push(node);
        id
    }

    pub(crate) fn push_page(&mut self, page: PageEntry) {
        self.pages.push(page);
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn page_mut(&mut self, name: &str) -> Option<&mut PageEntry> {
        self.pages.iter_mut().find(|p| p.name == name)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn pages(&self) -> &[PageEntry] {
        &self.pages
    }

    #[must_use]
    pub fn page(&self, name: &str) -> Option<&PageEntry> {
        self.pages.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn find_by_indexed_id(&self, indexed_id: &str) -> Option<NodeId> {
        self.by_indexed_id.get(indexed_id).copied()
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Ancestors of a node, nearest first.
    pub fn parents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        Parents {
            tree: self,
            current: self.node(id).parent,
        }
    }

    /// Every node in document order: page order, then depth-first with
    /// rows ascending.
    pub fn flat(&self) -> impl Iterator<Item = NodeId> + '_ {
        #[allow(clippy::cast_possible_truncation)]
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Effective hidden-ness: the node's own resolved value, any
    /// ancestor's, or the owning page's.
    #[must_use]
    pub fn is_hidden(&self, id: NodeId) -> bool {
        if self.node(id).item.hidden {
            return true;
        }
        if self.parents(id).any(|parent| self.node(parent).item.hidden) {
            return true;
        }
        self.page(&self.node(id).page).is_some_and(|p| p.hidden)
    }

    /// Finds the component `target` (base or indexed id) closest to
    /// `from`: the node itself, then siblings in the same row, then each
    /// ancestor level on the way up, then the whole tree in document
    /// order.
    #[must_use]
    pub fn closest(&self, from: NodeId, target: &str) -> Option<NodeId> {
        let matches = |id: NodeId| {
            let node = self.node(id);
            node.indexed_id == target || node.base_id == target
        };

        if matches(from) {
            return Some(from);
        }
        let mut scope = Some(from);
        while let Some(current) = scope {
            let siblings: &[NodeId] = match self.node(current).parent {
                Some(parent) => self.children(parent),
                None => self
                    .page(&self.node(current).page)
                    .map_or(&[], |p| p.top_level.as_slice()),
            };
            // A repeating parent holds every row's children; a sibling in
            // the same row shadows one in another row.
            let row = self.node(current).row_index;
            if let Some(found) = siblings
                .iter()
                .copied()
                .find(|&id| matches(id) && self.node(id).row_index == row)
                .or_else(|| siblings.iter().copied().find(|&id| matches(id)))
            {
                return Some(found);
            }
            scope = self.node(current).parent;
        }
        self.flat().find(|&id| matches(id))
    }
}

struct Parents<'a> {
    tree: &'a NodeTree,
    current: Option<NodeId>,
}

impl Iterator for Parents<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.node(id).parent;
        Some(id)
    }
}
