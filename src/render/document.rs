//! HTML document shell around a rendered page body.
//!
//! ```text
//! <html>
//!   <head> charset, viewport, collected styles </head>
//!   <body>
//!     <div id="root"> page body </div>
//!     <script async src="/app.js"></script>   one per `.js` client file
//!   </body>
//! </html>
//! ```

use quick_xml::escape::escape;

const VIEWPORT: &str = "width=device-width,minimum-scale=1,initial-scale=1";
const DEFAULT_ROOT_ID: &str = "root";
const DEFAULT_ASSET_HOST: &str = "/";

/// Pass-through options of the document shell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShellOptions<'a> {
    /// CSP nonce added to every script tag
    pub nonce: Option<&'a str>,
    /// Id of the element the page body is mounted in (default `root`)
    pub root_id: Option<&'a str>,
    /// Prefix of script URLs (default `/`)
    pub asset_host: Option<&'a str>,
}

/// Build the document markup (without doctype).
///
/// Only client files ending in `.js` get a script tag; stylesheets and
/// source maps must be linked by other means.
pub fn document(body: &str, files: &[String], styles: &str, options: ShellOptions<'_>) -> String {
    let root_id = options.root_id.unwrap_or(DEFAULT_ROOT_ID);

    let mut html = String::with_capacity(body.len() + styles.len() + 256);
    html.push_str("<html><head>");
    html.push_str(r#"<meta charset="utf-8"/>"#);
    html.push_str(&format!(r#"<meta name="viewport" content="{VIEWPORT}"/>"#));
    html.push_str(styles);
    html.push_str("</head><body>");
    html.push_str(&format!(r#"<div id="{}">{body}</div>"#, escape(root_id)));
    for file in files.iter().filter(|f| f.ends_with(".js")) {
        html.push_str(&script_tag(file, options));
    }
    html.push_str("</body></html>");
    html
}

fn script_tag(file: &str, options: ShellOptions<'_>) -> String {
    let src = script_src(options.asset_host, file);
    match options.nonce {
        Some(nonce) => format!(
            r#"<script async src="{}" nonce="{}"></script>"#,
            escape(&src),
            escape(nonce)
        ),
        None => format!(r#"<script async src="{}"></script>"#, escape(&src)),
    }
}

/// Join the asset host and the URI-encoded file name.
fn script_src(asset_host: Option<&str>, file: &str) -> String {
    let host = asset_host.unwrap_or(DEFAULT_ASSET_HOST);
    let encoded = file
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{encoded}", host.trim_end_matches('/'))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_only_js_files_get_scripts() {
        let files = files(&["app.abc123.js", "app.abc123.css", "vendor.js"]);
        let html = document("<p>hi</p>", &files, "", ShellOptions::default());

        assert_eq!(html.matches("<script").count(), 2);
        assert!(html.contains(r#"<script async src="/app.abc123.js"></script>"#));
        assert!(html.contains(r#"<script async src="/vendor.js"></script>"#));
        assert!(!html.contains("app.abc123.css"));
    }

    #[test]
    fn test_map_files_are_not_scripts() {
        let files = files(&["app.js.map"]);
        let html = document("", &files, "", ShellOptions::default());
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_body_and_styles_placement() {
        let html = document(
            "<main>content</main>",
            &[],
            "<style>main{color:red}</style>",
            ShellOptions::default(),
        );
        assert_eq!(
            html,
            concat!(
                "<html><head>",
                r#"<meta charset="utf-8"/>"#,
                r#"<meta name="viewport" content="width=device-width,minimum-scale=1,initial-scale=1"/>"#,
                "<style>main{color:red}</style>",
                "</head><body>",
                r#"<div id="root"><main>content</main></div>"#,
                "</body></html>"
            )
        );
    }

    #[test]
    fn test_shell_options() {
        let options = ShellOptions {
            nonce: Some("r4nd0m"),
            root_id: Some("app"),
            asset_host: Some("https://cdn.example.com/"),
        };
        let html = document("", &files(&["main.js"]), "", options);

        assert!(html.contains(r#"<div id="app"></div>"#));
        assert!(html.contains(
            r#"<script async src="https://cdn.example.com/main.js" nonce="r4nd0m"></script>"#
        ));
    }

    #[test]
    fn test_script_src_encoding() {
        assert_eq!(script_src(None, "app.js"), "/app.js");
        assert_eq!(script_src(None, "js/my app.js"), "/js/my%20app.js");
        assert_eq!(script_src(Some("/static"), "/app.js"), "/static/app.js");
        assert_eq!(script_src(Some("/static/"), "app.js"), "/static/app.js");
    }

    #[test]
    fn test_attributes_are_escaped() {
        let options = ShellOptions {
            nonce: Some(r#"a"b"#),
            root_id: Some("<x>"),
            asset_host: None,
        };
        let html = document("", &files(&["a.js"]), "", options);
        assert!(html.contains(r#"nonce="a&quot;b""#));
        assert!(html.contains(r#"id="&lt;x&gt;""#));
    }
}
