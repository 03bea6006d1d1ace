//! Flattened, precedence-sorted URL table and its matcher.
//!
//! Every routable node contributes an entry for its own pattern plus one
//! entry per distinct handler subpath (`<node pattern>/<subpath>`). The
//! catchall node contributes a single entry that matches every path.
//!
//! Matching is linear over the sorted entries: first match wins.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::node::{ComponentModule, RouteNode};
use super::pattern::is_dynamic_segment;
use super::precedence::sort_by_precedence;
use crate::handlers::HandlerRegistry;

/// What an entry is bound to: the node's page and handlers.
#[derive(Debug, Clone)]
pub struct RouteView {
    pub node_id: String,
    pub url_pattern: String,
    pub route_pattern: String,
    pub page: Option<ComponentModule>,
    pub layout: Option<ComponentModule>,
    pub registry: Option<Arc<HandlerRegistry>>,
    pub catchall: bool,
}

impl RouteView {
    fn from_node(node: &RouteNode) -> Self {
        Self {
            node_id: node.id.clone(),
            url_pattern: node.url_pattern.clone(),
            route_pattern: node.route_pattern.clone(),
            page: node.page_module.clone(),
            layout: node.effective_layout.clone(),
            registry: node.registry().cloned(),
            catchall: node.is_catchall(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// One URL pattern bound to a view and subpath.
#[derive(Debug, Clone)]
pub struct UrlEntry {
    pattern: String,
    subpath: String,
    view: Arc<RouteView>,
    segments: Vec<Segment>,
}

impl UrlEntry {
    fn new(pattern: String, subpath: &str, view: Arc<RouteView>) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if is_dynamic_segment(s) {
                    Segment::Param(s[1..s.len() - 1].to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern,
            subpath: subpath.to_string(),
            view,
            segments,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    pub fn view(&self) -> &Arc<RouteView> {
        &self.view
    }

    pub fn is_catchall(&self) -> bool {
        self.view.catchall
    }

    fn matches(&self, path: &str) -> Option<RouteMatch> {
        if self.is_catchall() {
            return Some(RouteMatch {
                view: Arc::clone(&self.view),
                subpath: String::new(),
                args: vec![path.to_string()],
                kwargs: BTreeMap::new(),
            });
        }

        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut kwargs = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(text) if text == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    kwargs.insert(name.clone(), part.to_string());
                }
            }
        }

        Some(RouteMatch {
            view: Arc::clone(&self.view),
            subpath: self.subpath.clone(),
            args: Vec::new(),
            kwargs,
        })
    }
}

impl fmt::Display for UrlEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<40} {}", self.pattern, self.view.node_id)?;
        if !self.subpath.is_empty() {
            write!(f, " [{}]", self.subpath)?;
        }
        Ok(())
    }
}

/// Result of resolving a request path.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub view: Arc<RouteView>,
    pub subpath: String,
    /// Positional URL arguments (the path, for the catchall).
    pub args: Vec<String>,
    /// Named URL arguments captured by `<name>` segments.
    pub kwargs: BTreeMap<String, String>,
}

/// Sorted URL table.
#[derive(Debug, Clone, Default)]
pub struct UrlTable {
    entries: Vec<UrlEntry>,
}

impl UrlTable {
    /// Flatten `root` into entries and sort them by precedence.
    pub fn from_tree(root: &RouteNode) -> Self {
        let mut entries = Vec::new();

        for node in root.walk() {
            if !node.is_routable() {
                continue;
            }
            let view = Arc::new(RouteView::from_node(node));
            entries.push(UrlEntry::new(node.url_pattern.clone(), "", Arc::clone(&view)));

            if node.is_catchall() {
                continue;
            }
            if let Some(registry) = node.registry() {
                for subpath in registry.subpaths() {
                    let pattern = if node.url_pattern.is_empty() {
                        subpath.to_string()
                    } else {
                        format!("{}/{}", node.url_pattern, subpath)
                    };
                    entries.push(UrlEntry::new(pattern, subpath, Arc::clone(&view)));
                }
            }
        }

        sort_by_precedence(&mut entries, |e| (e.pattern.as_str(), e.is_catchall()));
        Self { entries }
    }

    pub fn entries(&self) -> &[UrlEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `path` (relative to the mount point) to the first matching entry.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let path = path.trim_start_matches('/');
        self.entries.iter().find_map(|entry| entry.matches(path))
    }
}
