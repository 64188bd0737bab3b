//! Detecting which web server the rules are written for.

use cdnenv_rules::ServerKind;
use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:literal) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `Apache/2.4.58 (Ubuntu)`, `nginx/1.25.3`, `LiteSpeed`, ...
regex!(SERVER_SOFTWARE, r"(?i)\b(nginx|litespeed|apache)\b(?:/([^\s;()]+))?");

/// Tells the generator which server family to write rules for.
pub trait ServerDetector: Send + Sync {
    fn is_nginx(&self) -> bool;
    fn is_apache(&self) -> bool;
    fn is_litespeed(&self) -> bool;

    /// Nginx wins over LiteSpeed, which wins over Apache.
    fn kind(&self) -> ServerKind {
        if self.is_nginx() {
            ServerKind::Nginx
        } else if self.is_litespeed() {
            ServerKind::LiteSpeed
        } else if self.is_apache() {
            ServerKind::Apache
        } else {
            ServerKind::Other
        }
    }
}

/// Server identity parsed from a `SERVER_SOFTWARE` style string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerSoftware {
    kind: ServerKind,
    version: Option<String>,
}

impl ServerSoftware {
    pub fn new(kind: ServerKind) -> Self {
        Self { kind, version: None }
    }

    /// Unrecognised servers become [`ServerKind::Other`].
    pub fn parse(software: &str) -> Self {
        let Some(captures) = SERVER_SOFTWARE.captures(software) else {
            return Self::new(ServerKind::Other);
        };
        let kind = match captures[1].to_ascii_lowercase().as_str() {
            "nginx" => ServerKind::Nginx,
            "litespeed" => ServerKind::LiteSpeed,
            _ => ServerKind::Apache,
        };
        Self { kind, version: captures.get(2).map(|m| m.as_str().to_string()) }
    }

    /// Reads the `SERVER_SOFTWARE` environment variable.
    pub fn from_env() -> Self {
        let software = std::env::var("SERVER_SOFTWARE").unwrap_or_default();
        let detected = Self::parse(&software);
        tracing::debug!(software = %software, kind = ?detected.kind, "Detected web server");
        detected
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl ServerDetector for ServerSoftware {
    fn is_nginx(&self) -> bool {
        self.kind == ServerKind::Nginx
    }

    fn is_apache(&self) -> bool {
        self.kind == ServerKind::Apache
    }

    fn is_litespeed(&self) -> bool {
        self.kind == ServerKind::LiteSpeed
    }

    fn kind(&self) -> ServerKind {
        self.kind
    }
}
