//! Nested client-side route descriptor.
//!
//! Layouts nest; every page hangs off the nearest layout above it. Paths
//! are relative to the parent layout. A page at its layout's own path is an
//! index route, the catchall page is `*`.

use serde::Serialize;

use super::node::RouteNode;

/// One client route: a layout (with children) or a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRoute {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub index: bool,
    /// Import path of the component (`docs/layout`, `blog/_slug/page`).
    pub element: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClientRoute>,
}

/// Descriptor for the whole tree, rooted at the root layout.
///
/// `None` when the root has no layout, which a built tree never does.
pub fn client_routes(root: &RouteNode) -> Option<ClientRoute> {
    layout_route(root, None)
}

fn layout_route(node: &RouteNode, parent_pattern: Option<&str>) -> Option<ClientRoute> {
    let layout = node.layout_module.as_ref()?;

    let mut pages = Vec::new();
    let mut layouts = Vec::new();
    collect(node, &node.route_pattern, &mut pages, &mut layouts);
    layouts.sort_by(|a: &ClientRoute, b: &ClientRoute| a.id.cmp(&b.id));

    let path = match parent_pattern {
        None => node.route_pattern.clone(),
        Some(parent) => relative(parent, &node.route_pattern),
    };

    pages.extend(layouts);
    Some(ClientRoute {
        id: format!("{}_layout", node.id),
        path: Some(path),
        index: false,
        element: layout.import_path.clone(),
        children: pages,
    })
}

fn collect(node: &RouteNode, layout_pattern: &str, pages: &mut Vec<ClientRoute>, layouts: &mut Vec<ClientRoute>) {
    if let Some(page) = &node.page_module {
        let (path, index) = if node.is_catchall() {
            (Some("*".to_string()), false)
        } else if node.route_pattern == layout_pattern {
            (None, true)
        } else {
            (Some(relative(layout_pattern, &node.route_pattern)), false)
        };
        pages.push(ClientRoute {
            id: node.id.clone(),
            path,
            index,
            element: page.import_path.clone(),
            children: Vec::new(),
        });
    }

    for child in &node.children {
        if child.layout_module.is_some() {
            layouts.extend(layout_route(child, Some(layout_pattern)));
        } else {
            collect(child, layout_pattern, pages, layouts);
        }
    }
}

fn relative(parent: &str, pattern: &str) -> String {
    pattern
        .strip_prefix(parent)
        .unwrap_or(pattern)
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::StaticModules;
    use crate::routes::RouteTreeBuilder;
    use std::fs;
    use std::path::Path;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_nested_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "layout.tsx");
        touch(root, "page.tsx");
        touch(root, "docs/layout.tsx");
        touch(root, "docs/page.tsx");
        touch(root, "docs/_slug/page.tsx");
        touch(root, "_slug/page.tsx");
        touch(root, "catchall/page.tsx");

        let modules = StaticModules::new();
        let tree = RouteTreeBuilder::new(root, &modules).build().unwrap();
        let routes = client_routes(&tree).unwrap();

        assert_eq!(routes.path.as_deref(), Some("/"));
        assert_eq!(routes.element, "layout");
        let ids: Vec<&str> = routes.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["$root", "_slug", "catchall", "docs_layout"]);

        assert!(routes.children[0].index);
        assert_eq!(routes.children[1].path.as_deref(), Some(":slug"));
        assert_eq!(routes.children[2].path.as_deref(), Some("*"));

        let docs = &routes.children[3];
        assert_eq!(docs.path.as_deref(), Some("docs"));
        assert!(docs.children[0].index);
        assert_eq!(docs.children[1].path.as_deref(), Some(":slug"));
        assert_eq!(docs.children[1].element, "docs/_slug/page");
    }

    #[test]
    fn test_serialized_shape() {
        let route = ClientRoute {
            id: "about".into(),
            path: Some("about".into()),
            index: false,
            element: "about/page".into(),
            children: Vec::new(),
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json, serde_json::json!({"id": "about", "path": "about", "element": "about/page"}));
    }
}
