//! CDN engine classification.

/// Engines that pull content from the origin on demand. They need neither
/// the upload queue nor auto-upload jobs.
pub const MIRROR_ENGINES: &[&str] = &[
    "mirror",
    "netdna",
    "maxcdn",
    "cotendo",
    "cf2",
    "akamai",
    "edgecast",
    "att",
    "highwinds",
    "limelight",
    "rackspace_cdn",
    "stackpath",
    "stackpath2",
    "bunnycdn",
];

/// Engine identifier that also gets a copy of the rules on the FTP host.
pub const FTP_ENGINE: &str = "ftp";

pub trait EngineCatalog: Send + Sync {
    fn is_mirror(&self, engine: &str) -> bool;
}

/// Catalog over [`MIRROR_ENGINES`].
#[derive(Clone, Copy, Debug, Default)]
pub struct KnownEngines;

impl EngineCatalog for KnownEngines {
    fn is_mirror(&self, engine: &str) -> bool {
        MIRROR_ENGINES.contains(&engine)
    }
}
