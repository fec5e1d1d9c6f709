//! HTML documentation page.

use crate::config::DocsConfig;

/// Swagger UI release loaded by the page.
pub const SWAGGER_UI_VERSION: &str = "5.17.14";

const CDN: &str = "https://unpkg.com/swagger-ui-dist";

/// Renders a Swagger UI page that loads the document from `docs.spec_path`.
#[must_use]
pub fn render_page(docs: &DocsConfig) -> String {
    let title = escape(&docs.title);
    let spec_url = escape(&docs.spec_path);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>{title}</title>
  <link rel="stylesheet" href="{CDN}@{SWAGGER_UI_VERSION}/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="{CDN}@{SWAGGER_UI_VERSION}/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{
        url: "{spec_url}",
        dom_id: "#swagger-ui",
      }});
    }};
  </script>
</body>
</html>
"##
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
