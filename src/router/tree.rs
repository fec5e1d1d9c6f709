//! Arena-backed route tree.
//!
//! Nodes are addressed by [`NodeId`] and never removed, so handles held by
//! callers stay valid for the life of the tree.

use crate::option::{GroupConfig, GroupOption, OperationOption};
use crate::path;
use crate::reflector::Reflector;

/// Index of a node in its [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node.
    pub const ROOT: Self = Self(0);
}

/// A route registered on a node.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Method as registered.
    pub method: String,
    /// Full, normalised path.
    pub path: String,
    /// Route options, in registration order.
    pub options: Vec<OperationOption>,
}

#[derive(Debug)]
struct Node {
    prefix: String,
    group_options: Vec<GroupOption>,
    routes: Vec<RouteEntry>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(prefix: String, group_options: Vec<GroupOption>) -> Self {
        Self {
            prefix,
            group_options,
            routes: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Counters reported after a compilation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Routes handed to the reflector.
    pub routes: usize,
    /// Groups skipped because they were hidden.
    pub hidden_groups: usize,
}

/// Deferred registration tree.
#[derive(Debug)]
pub struct RouteTree {
    nodes: Vec<Node>,
    sealed: bool,
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTree {
    /// A tree with only the root node, whose prefix is `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("/".to_string(), Vec::new())],
            sealed: false,
        }
    }

    /// Marks the tree as compiled. Later changes are still recorded but
    /// never reach a document.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// `true` once [`RouteTree::seal`] has been called.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Normalised prefix of `id`.
    #[must_use]
    pub fn prefix(&self, id: NodeId) -> &str {
        self.nodes.get(id.0).map_or("/", |n| n.prefix.as_str())
    }

    /// Registers a route under `id` and returns its index within the node.
    pub fn add_route(
        &mut self,
        id: NodeId,
        method: &str,
        route_path: &str,
        options: Vec<OperationOption>,
    ) -> Option<usize> {
        let node = self.nodes.get_mut(id.0)?;
        let entry = RouteEntry {
            method: method.to_string(),
            path: path::join(&node.prefix, route_path),
            options,
        };
        node.routes.push(entry);
        Some(node.routes.len() - 1)
    }

    /// Route `index` of node `id`.
    #[must_use]
    pub fn route(&self, id: NodeId, index: usize) -> Option<&RouteEntry> {
        self.nodes.get(id.0)?.routes.get(index)
    }

    /// Appends options to route `index` of node `id`.
    pub fn extend_route(
        &mut self,
        id: NodeId,
        index: usize,
        options: impl IntoIterator<Item = OperationOption>,
    ) -> bool {
        match self
            .nodes
            .get_mut(id.0)
            .and_then(|node| node.routes.get_mut(index))
        {
            Some(route) => {
                route.options.extend(options);
                true
            }
            None => false,
        }
    }

    /// Creates a child of `parent` whose prefix is `parent.prefix + prefix`.
    pub fn add_group(
        &mut self,
        parent: NodeId,
        prefix: &str,
        options: Vec<GroupOption>,
    ) -> Option<NodeId> {
        let full = path::join(self.nodes.get(parent.0)?.prefix.as_str(), prefix);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(full, options));
        self.nodes.get_mut(parent.0)?.children.push(id);
        Some(id)
    }

    /// Appends group options to node `id`.
    pub fn use_options(&mut self, id: NodeId, options: impl IntoIterator<Item = GroupOption>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.group_options.extend(options);
        }
    }

    /// Walks the tree depth-first and hands every visible route to
    /// `reflector`.
    ///
    /// Each node's effective group options are its ancestors' options
    /// followed by its own. A hidden node is skipped together with its
    /// whole subtree. Every other route is committed with the inherited
    /// options (tags, then security, then deprecation) placed before its
    /// own.
    pub fn compile(&self, reflector: &mut dyn Reflector) -> CompileStats {
        let mut stats = CompileStats::default();
        self.compile_node(NodeId::ROOT, &[], reflector, &mut stats);
        stats
    }

    fn compile_node(
        &self,
        id: NodeId,
        inherited: &[GroupOption],
        reflector: &mut dyn Reflector,
        stats: &mut CompileStats,
    ) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let mut effective = inherited.to_vec();
        effective.extend(node.group_options.iter().cloned());
        let group = GroupConfig::resolve(&effective);
        if group.hide {
            tracing::debug!(prefix = %node.prefix, "skipping hidden group");
            stats.hidden_groups += 1;
            return;
        }

        let prefixed = group.operation_options();
        for route in &node.routes {
            let mut options = prefixed.clone();
            options.extend(route.options.iter().cloned());
            reflector.add(&route.method, &route.path, &options);
            stats.routes += 1;
        }
        for child in &node.children {
            self.compile_node(*child, &effective, reflector, stats);
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::option::{self, OperationConfig};
    use crate::reflector::Document;

    #[derive(Debug, Default)]
    struct Capture {
        routes: Vec<(String, String, OperationConfig)>,
    }

    impl Reflector for Capture {
        fn openapi_version(&self) -> &str {
            "3.0.3"
        }
        fn add(&mut self, method: &str, path: &str, options: &[OperationOption]) {
            self.routes.push((
                method.to_string(),
                path.to_string(),
                OperationConfig::resolve(options),
            ));
        }
        fn document(&self) -> Option<Document<'_>> {
            None
        }
        fn validate(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn prefixes_are_joined_and_cleaned() {
        let mut tree = RouteTree::new();
        let Some(api) = tree.add_group(NodeId::ROOT, "api/", Vec::new()) else {
            panic!("unexpected tree state");
        };
        let Some(v1) = tree.add_group(api, "//v1", Vec::new()) else {
            panic!("unexpected tree state");
        };
        assert_eq!(tree.prefix(NodeId::ROOT), "/");
        assert_eq!(tree.prefix(v1), "/api/v1");
        tree.add_route(v1, "GET", "pets/", Vec::new());

        let mut capture = Capture::default();
        let stats = tree.compile(&mut capture);
        assert_eq!(stats.routes, 1);
        assert_eq!(capture.routes.first().map(|r| r.1.as_str()), Some("/api/v1/pets"));
    }

    #[test]
    fn hidden_group_skips_subtree() {
        let mut tree = RouteTree::new();
        tree.add_route(NodeId::ROOT, "GET", "/public", Vec::new());
        let Some(admin) = tree.add_group(NodeId::ROOT, "/admin", vec![option::group_hidden()])
        else {
            panic!("unexpected tree state");
        };
        tree.add_route(admin, "GET", "/users", Vec::new());
        let Some(deep) = tree.add_group(admin, "/deep", Vec::new()) else {
            panic!("unexpected tree state");
        };
        tree.add_route(deep, "GET", "/x", Vec::new());

        let mut capture = Capture::default();
        let stats = tree.compile(&mut capture);
        assert_eq!(stats, CompileStats { routes: 1, hidden_groups: 1 });
        assert_eq!(capture.routes.len(), 1);
    }

    #[test]
    fn hidden_parent_wins_over_unhidden_child() {
        let mut tree = RouteTree::new();
        let Some(parent) = tree.add_group(NodeId::ROOT, "/p", vec![option::group_hidden()]) else {
            panic!("unexpected tree state");
        };
        let Some(child) = tree.add_group(parent, "/c", vec![GroupOption::Hide(false)]) else {
            panic!("unexpected tree state");
        };
        tree.add_route(child, "GET", "/x", Vec::new());
        let mut capture = Capture::default();
        assert_eq!(tree.compile(&mut capture).routes, 0);
    }

    #[test]
    fn inherited_options_precede_route_options() {
        let mut tree = RouteTree::new();
        let Some(api) = tree.add_group(
            NodeId::ROOT,
            "/api",
            vec![option::group_tags(&["api"]), option::group_security("key", &[])],
        ) else {
            panic!("unexpected tree state");
        };
        let Some(pets) = tree.add_group(
            api,
            "/pets",
            vec![option::group_tags(&["pets"]), option::group_deprecated()],
        ) else {
            panic!("unexpected tree state");
        };
        tree.add_route(
            pets,
            "GET",
            "/",
            vec![option::tags(&["pets"]), OperationOption::Deprecated(false)],
        );

        let mut capture = Capture::default();
        tree.compile(&mut capture);
        let Some((_, path, config)) = capture.routes.first() else {
            panic!("unexpected tree state");
        };
        assert_eq!(path, "/api/pets");
        assert_eq!(config.tags, vec!["api", "pets", "pets"]);
        assert_eq!(config.security.len(), 1);
        assert!(!config.deprecated);
    }

    #[test]
    fn use_options_apply_at_compile_time() {
        let mut tree = RouteTree::new();
        tree.add_route(NodeId::ROOT, "GET", "/a", Vec::new());
        tree.use_options(NodeId::ROOT, [option::group_tags(&["late"])]);
        assert!(tree.extend_route(NodeId::ROOT, 0, [option::summary("A")]));
        assert!(!tree.extend_route(NodeId::ROOT, 5, [option::summary("B")]));

        let mut capture = Capture::default();
        tree.compile(&mut capture);
        let Some((_, _, config)) = capture.routes.first() else {
            panic!("unexpected tree state");
        };
        assert_eq!(config.tags, vec!["late"]);
        assert_eq!(config.summary, "A");
    }

    #[test]
    fn seal_is_sticky() {
        let mut tree = RouteTree::new();
        assert!(!tree.is_sealed());
        tree.seal();
        assert!(tree.is_sealed());
        let mut capture = Capture::default();
        tree.compile(&mut capture);
        assert!(tree.is_sealed());
    }
}
