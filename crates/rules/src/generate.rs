//! CDN rule block generation.
//!
//! Produces the CORS and canonical-URL header directives for CDN-served
//! assets, in Apache-family (`.htaccess`) or Nginx syntax, wrapped in the
//! [`BEGIN_CDN`]/[`END_CDN`] markers. An empty string means "no block
//! needed" and makes the writer remove any block already in place.

use crate::markers::{BEGIN_CDN, END_CDN};

/// Font assets that browsers fetch with CORS and therefore need the
/// allow-origin header when served from a mirror on another host.
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "ttc", "otf", "eot", "woff", "woff2", "font.css"];

/// Static assets that get a canonical `Link` header pointing back at the
/// origin site.
pub const CANONICAL_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "css", "eot", "gif", "ico", "jpeg", "jpg", "js", "mp3", "mp4", "ogg", "otf", "pdf", "png", "svg",
    "svgz", "swf", "ttc", "ttf", "webm", "webp", "woff", "woff2",
];

/// Web server family the rules are written for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServerKind {
    Apache,
    LiteSpeed,
    Nginx,
    /// Anything else (IIS, Caddy, ...). Gets Apache syntax minus the
    /// `mod_headers` CORS stanza, which only Apache and LiteSpeed understand.
    Other,
}

/// Inputs of the generator, taken from the CDN configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleOptions<'a> {
    pub canonical_header: bool,
    pub cors_header: bool,
    /// Public host of the origin site. Canonical links of FTP mirrors point
    /// here since the mirror host receives the request.
    pub site_host: Option<&'a str>,
}

/// Generates the CDN rule block for `server`.
///
/// `ftp` selects the variant uploaded to (or served for) an FTP-style mirror:
/// canonical links use the configured site host and the CORS header is only
/// set for [`FONT_EXTENSIONS`].
///
/// # Examples
///
/// ```
/// use cdnenv_rules::{RuleOptions, ServerKind, generate};
///
/// let none = RuleOptions::default();
/// assert_eq!(generate(ServerKind::Apache, &none, false), "");
///
/// let cors = RuleOptions { cors_header: true, ..Default::default() };
/// let block = generate(ServerKind::Apache, &cors, false);
/// assert!(block.starts_with("# BEGIN CDN\n"));
/// assert!(block.contains("Header set Access-Control-Allow-Origin \"*\""));
/// ```
pub fn generate(server: ServerKind, options: &RuleOptions<'_>, ftp: bool) -> String {
    let body = match server {
        ServerKind::Nginx => nginx::body(options, ftp),
        ServerKind::Apache | ServerKind::LiteSpeed | ServerKind::Other => apache::body(server, options, ftp),
    };
    if body.is_empty() {
        return body;
    }
    format!("{BEGIN_CDN}\n{body}{END_CDN}\n")
}

fn alternation(extensions: &[&str]) -> String {
    extensions.join("|")
}

mod apache {
    use super::*;

    pub(super) fn body(server: ServerKind, options: &RuleOptions<'_>, ftp: bool) -> String {
        let mut rules = String::new();
        if options.canonical_header {
            rules.push_str(&canonical(options, ftp));
        }
        if options.cors_header {
            rules.push_str(&allow_origin(server, ftp));
        }
        rules
    }

    fn canonical(options: &RuleOptions<'_>, ftp: bool) -> String {
        let host = match (ftp, options.site_host) {
            (true, Some(host)) => host,
            _ => "%{HTTP_HOST}",
        };
        let mut r = format!("<FilesMatch \"\\.({})$\">\n", alternation(CANONICAL_EXTENSIONS));
        r.push_str("    <IfModule mod_rewrite.c>\n");
        r.push_str("        RewriteEngine On\n");
        r.push_str("        RewriteCond %{HTTPS} !=on\n");
        r.push_str(&format!("        RewriteRule .* - [E=CANONICAL:http://{host}%{{REQUEST_URI}},NE]\n"));
        r.push_str("        RewriteCond %{HTTPS} =on\n");
        r.push_str(&format!("        RewriteRule .* - [E=CANONICAL:https://{host}%{{REQUEST_URI}},NE]\n"));
        r.push_str("    </IfModule>\n");
        r.push_str("    <IfModule mod_headers.c>\n");
        r.push_str("        Header set Link \"<%{CANONICAL}e>; rel=\\\"canonical\\\"\"\n");
        if options.cors_header {
            r.push_str("        Header append Vary \"Origin\"\n");
        }
        r.push_str("    </IfModule>\n");
        r.push_str("</FilesMatch>\n");
        r
    }

    fn allow_origin(server: ServerKind, ftp: bool) -> String {
        if !matches!(server, ServerKind::Apache | ServerKind::LiteSpeed) {
            return String::new();
        }
        let stanza = "<IfModule mod_headers.c>\n    Header set Access-Control-Allow-Origin \"*\"\n</IfModule>\n";
        if !ftp {
            return stanza.to_string();
        }
        format!("<FilesMatch \"\\.({})$\">\n{stanza}</FilesMatch>\n", alternation(FONT_EXTENSIONS))
    }
}

mod nginx {
    use super::*;

    pub(super) fn body(options: &RuleOptions<'_>, ftp: bool) -> String {
        let mut rules = String::new();
        if options.canonical_header {
            let host = match (ftp, options.site_host) {
                (true, Some(host)) => host,
                _ => "$host",
            };
            rules.push_str(&format!("add_header Link \"<$scheme://{host}$request_uri>; rel=\\\"canonical\\\"\";\n"));
            if options.cors_header {
                rules.push_str("add_header Vary \"Origin\";\n");
            }
        }
        // Nginx has no unconditional per-file header stanza that survives
        // location-level add_header, so fonts always get their own location.
        if options.cors_header {
            rules.push_str(&format!("location ~ \\.({})$ {{\n", alternation(FONT_EXTENSIONS)));
            rules.push_str("    add_header Access-Control-Allow-Origin \"*\";\n");
            rules.push_str("}\n");
        }
        rules
    }
}
