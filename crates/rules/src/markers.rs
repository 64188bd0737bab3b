//! Markers delimiting the rule blocks different subsystems own inside one
//! shared server configuration file.

/// Opens the CDN block.
pub const BEGIN_CDN: &str = "# BEGIN CDN";
/// Closes the CDN block.
pub const END_CDN: &str = "# END CDN";

pub const BEGIN_MINIFY_CORE: &str = "# BEGIN Minify core";
pub const BEGIN_PGCACHE_CORE: &str = "# BEGIN Page Cache core";
pub const BEGIN_BROWSERCACHE_NO404: &str = "# BEGIN Browser Cache Skip 404";
pub const BEGIN_BROWSERCACHE_CACHE: &str = "# BEGIN Browser Cache";
pub const BEGIN_WORDPRESS: &str = "# BEGIN WordPress";
pub const END_PGCACHE_CACHE: &str = "# END Page Cache cache";
pub const END_MINIFY_CACHE: &str = "# END Minify cache";

/// An ordering hint: "insert at the line of `marker`, shifted by `offset`
/// lines". Hints are tried in order and the first marker present wins.
pub type Hint<'a> = (&'a str, usize);

/// Where the CDN block goes when it isn't in the file yet: above the cache
/// cores and the application's own directives, or directly below the page
/// cache and minify cache blocks.
pub const CDN_HINTS: &[Hint<'static>] = &[
    (BEGIN_MINIFY_CORE, 0),
    (BEGIN_PGCACHE_CORE, 0),
    (BEGIN_BROWSERCACHE_NO404, 0),
    (BEGIN_BROWSERCACHE_CACHE, 0),
    (BEGIN_WORDPRESS, 0),
    (END_PGCACHE_CACHE, 1),
    (END_MINIFY_CACHE, 1),
];
