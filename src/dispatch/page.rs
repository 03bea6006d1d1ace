//! Page rendering.
//!
//! The dispatcher resolves the loader's data; a [`PageRenderer`] turns the
//! page, its layout and that data into an HTML document.

use serde::Serialize;

use super::error_page::escape_html;
use super::request::Principal;
use crate::routes::ComponentModule;

/// Site-wide metadata available to every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
    pub noscript_message: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "RouteKit".to_string(),
            description: String::new(),
            noscript_message: "This site requires JavaScript to be enabled.".to_string(),
        }
    }
}

/// Inputs for rendering one page.
#[derive(Debug)]
pub struct PageContext<'a> {
    pub node_id: &'a str,
    pub page: &'a ComponentModule,
    pub layout: Option<&'a ComponentModule>,
    /// Request path.
    pub path: &'a str,
    pub site: &'a SiteMeta,
    pub principal: Option<&'a Principal>,
    /// The loader's data, `null` without a loader.
    pub data: &'a serde_json::Value,
}

pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// Renders the app template for a page.
pub trait PageRenderer: Send + Sync {
    fn render(&self, context: &PageContext<'_>) -> Result<String, RenderError>;
}

/// Client-side rendered app shell.
#[derive(Debug, Clone, Default)]
pub struct ShellRenderer;

impl PageRenderer for ShellRenderer {
    fn render(&self, context: &PageContext<'_>) -> Result<String, RenderError> {
        let data = script_json(context.data)?;
        let user = script_json(&user_json(context.principal))?;
        let layout = context.layout.map(|l| l.import_path.as_str()).unwrap_or("");

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="description" content="{description}">
  <title>{title}</title>
</head>
<body>
  <div id="root" data-route="{route}" data-path="{path}" data-page="{page}" data-layout="{layout}">
    <div class="loading">Loading...</div>
  </div>
  <script id="routekit-data" type="application/json">{data}</script>
  <script id="routekit-user" type="application/json">{user}</script>
  <noscript>{noscript}</noscript>
</body>
</html>
"#,
            description = escape_html(&context.site.description),
            title = escape_html(&context.site.title),
            route = escape_html(context.node_id),
            path = escape_html(context.path),
            page = escape_html(&context.page.import_path),
            layout = escape_html(layout),
            data = data,
            user = user,
            noscript = escape_html(&context.site.noscript_message),
        ))
    }
}

/// JSON safe to inline in a `<script>` element.
fn script_json(value: &serde_json::Value) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

/// The current user as the client sees it.
fn user_json(principal: Option<&Principal>) -> serde_json::Value {
    serde_json::json!({
        "id": principal.map(|p| p.id.as_str()),
        "username": principal.and_then(|p| p.username.as_deref()),
        "isAuthenticated": principal.is_some(),
        "isAnonymous": principal.is_none(),
    })
}
