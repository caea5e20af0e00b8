//! Page layout of the COPR web frontend.
//!
//! The frontend has no machine-readable API for builds, so discovery matches
//! on its HTML structure: a panel heading with a known label, the container
//! directly after the heading's parent, and links inside that container.
//! Only these constants need to change when the frontend layout changes.

/// Default hosting service.
pub const DEFAULT_BASE_URL: &str = "https://copr.fedorainfracloud.org";

/// Selector for the panel headings that carry the labels below.
pub const PANEL_HEADING: &str = "h3.panel-title";

/// Heading on the project page above the most recent build.
pub const LAST_BUILD_LABEL: &str = "Last Build";

/// Container following the "Last Build" heading's parent.
pub const LAST_BUILD_CONTAINER: &str = "div.list-group";

/// Link to the build inside [`LAST_BUILD_CONTAINER`].
pub const LAST_BUILD_LINK: &str = "a";

/// Heading on the build page above the per-chroot result table.
pub const RESULTS_LABEL: &str = "Results";

/// Container following the "Results" heading's parent.
pub const RESULTS_CONTAINER: &str = "div.panel-body";

/// One link per result row, pointing at the result index.
pub const RESULT_INDEX_LINK: &str = "tr td:first-child a";

/// File links in the directory listing of a result index.
pub const ARTIFACT_LINK: &str = "td.n a";

/// Default package-archive suffix kept by the artifact lister.
pub const DEFAULT_EXTENSION: &str = ".rpm";

/// Project page for `user/repository` under `base_url`.
pub fn project_page(base_url: &str, user: &str, repository: &str) -> String {
    format!(
        "{}/coprs/{}/{}/",
        base_url.trim_end_matches('/'),
        user,
        repository
    )
}
