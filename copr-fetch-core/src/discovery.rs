//! Discovery: from a `(user, repository)` pair to the list of artifact locations.
//!
//! Three pages are walked in turn:
//!
//! 1. the project page, whose "Last Build" panel links to the newest build;
//! 2. the build page, whose "Results" panel lists one result index per chroot;
//! 3. each result index, a directory listing with the package files.
//!
//! Each stage is an async function that fetches through a [`PageFetcher`] and a
//! synchronous `extract_*` function that reads the parsed page. Every failure in
//! discovery is fatal to the run; a missing `href` on an individual link is not
//! and only gets logged.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::contract::{
    last_segment, ArtifactReference, BuildReference, Document, PageFetcher, ResultIndexReference,
};
use crate::error::{DiscoveryError, ResolveError};
use crate::layout;

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("layout selectors are valid CSS")
}

/// Containers that directly follow the parent of each panel heading labelled
/// `label`, restricted to those matching `container`. Document order.
fn labelled_panels<'a>(html: &'a Html, label: &str, container: &Selector) -> Vec<ElementRef<'a>> {
    let heading = selector(layout::PANEL_HEADING);
    html.select(&heading)
        .filter(|h| h.text().collect::<String>().trim() == label)
        .filter_map(|h| h.parent().and_then(ElementRef::wrap))
        .filter_map(|parent| parent.next_siblings().find_map(ElementRef::wrap))
        .filter(|sibling| container.matches(sibling))
        .collect()
}

/// Resolve the `href` of `link` against `doc`, logging links that cannot be used.
fn resolve_link(doc: &Document, link: &ElementRef<'_>) -> Option<Url> {
    let Some(href) = link.value().attr("href") else {
        warn!(page = %doc.location(), "Link has no href, skipping");
        return None;
    };
    match doc.resolve(href) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(page = %doc.location(), href, error = %e, "Cannot resolve link, skipping");
            None
        }
    }
}

/// Read the "Last Build" link from a project page.
pub fn extract_last_build(doc: &Document) -> Result<BuildReference, ResolveError> {
    let html = doc.html();
    let container = selector(layout::LAST_BUILD_CONTAINER);
    let link = selector(layout::LAST_BUILD_LINK);

    labelled_panels(&html, layout::LAST_BUILD_LABEL, &container)
        .into_iter()
        .find_map(|panel| {
            panel
                .select(&link)
                .next()
                .and_then(|a| resolve_link(doc, &a))
        })
        .map(BuildReference::new)
        .ok_or_else(ResolveError::last_build_not_found)
}

/// Read the result index links from a build page, in row order.
pub fn extract_result_indexes(doc: &Document) -> Result<Vec<ResultIndexReference>, ResolveError> {
    let html = doc.html();
    let container = selector(layout::RESULTS_CONTAINER);
    let link = selector(layout::RESULT_INDEX_LINK);

    let indexes: Vec<ResultIndexReference> =
        labelled_panels(&html, layout::RESULTS_LABEL, &container)
            .into_iter()
            .flat_map(|panel| panel.select(&link).collect::<Vec<_>>())
            .filter_map(|a| resolve_link(doc, &a))
            .map(ResultIndexReference::new)
            .collect();

    if indexes.is_empty() {
        return Err(ResolveError::no_results_found());
    }
    Ok(indexes)
}

/// Read the artifact links from a result index, keeping only files whose name
/// ends with `extension`.
pub fn extract_artifacts(doc: &Document, extension: &str) -> Vec<ArtifactReference> {
    let html = doc.html();
    let link = selector(layout::ARTIFACT_LINK);

    html.select(&link)
        .filter_map(|a| {
            let Some(href) = a.value().attr("href") else {
                debug!(page = %doc.location(), "File link has no href, skipping");
                return None;
            };
            let url = match doc.resolve(href) {
                Ok(url) => url,
                Err(e) => {
                    warn!(page = %doc.location(), href, error = %e, "Cannot resolve file link, skipping");
                    return None;
                }
            };
            if last_segment(&url).is_some_and(|name| name.ends_with(extension)) {
                Some(ArtifactReference::new(url))
            } else {
                debug!(file = %url, extension, "Not an artifact, skipping");
                None
            }
        })
        .collect()
}

fn parse_location(location: &str) -> Result<Url, DiscoveryError> {
    Url::parse(location).map_err(|source| DiscoveryError::InvalidLocation {
        location: location.to_owned(),
        source,
    })
}

/// Find the most recent build of `user/repository` on the service at `base_url`.
pub async fn resolve_last_build<F>(
    fetcher: &F,
    base_url: &str,
    user: &str,
    repository: &str,
) -> Result<BuildReference, DiscoveryError>
where
    F: PageFetcher + ?Sized,
{
    let project = parse_location(&layout::project_page(base_url, user, repository))?;
    info!(user, repository, project = %project, "Resolving last build");

    let doc = fetcher.fetch(&project).await?;
    let build = extract_last_build(&doc)?;

    info!(build = %build, "Resolved last build");
    Ok(build)
}

/// List the result index of every chroot of `build`.
pub async fn resolve_result_indexes<F>(
    fetcher: &F,
    build: &BuildReference,
) -> Result<Vec<ResultIndexReference>, DiscoveryError>
where
    F: PageFetcher + ?Sized,
{
    let doc = fetcher.fetch(build.url()).await?;
    let indexes = extract_result_indexes(&doc)?;

    info!(build = %build, count = indexes.len(), "Resolved result indexes");
    Ok(indexes)
}

/// List every artifact in `indexes`. Fails as a whole if any index cannot be fetched.
pub async fn list_artifacts<F>(
    fetcher: &F,
    indexes: &[ResultIndexReference],
    extension: &str,
) -> Result<Vec<ArtifactReference>, DiscoveryError>
where
    F: PageFetcher + ?Sized,
{
    let mut artifacts = Vec::new();
    for index in indexes {
        let doc = fetcher.fetch(index.url()).await?;
        let found = extract_artifacts(&doc, extension);
        debug!(index = %index, count = found.len(), "Listed result index");
        artifacts.extend(found);
    }

    info!(
        indexes = indexes.len(),
        count = artifacts.len(),
        extension,
        "Listed artifacts"
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(location: &str, body: &str) -> Document {
        Document::new(Url::parse(location).unwrap(), body)
    }

    const PROJECT: &str = r#"
<html><body>
  <div class="panel panel-default">
    <div class="panel-heading"><h3 class="panel-title">Description</h3></div>
    <div class="panel-body"><a href="/elsewhere/">not this</a></div>
  </div>
  <div class="panel panel-default">
    <div class="panel-heading">
      <h3 class="panel-title">
        Last Build
      </h3>
    </div>
    <div class="list-group">
      <a class="list-group-item" href="/coprs/alice/tools/build/7312/">#7312</a>
      <a class="list-group-item" href="/coprs/alice/tools/build/7311/">#7311</a>
    </div>
  </div>
</body></html>"#;

    #[test]
    fn last_build_follows_heading_to_sibling_link() {
        let page = doc("https://copr.example.org/coprs/alice/tools/", PROJECT);
        let build = extract_last_build(&page).unwrap();
        assert_eq!(
            build.as_str(),
            "https://copr.example.org/coprs/alice/tools/build/7312/"
        );
    }

    #[test]
    fn last_build_missing_heading_is_resolve_error() {
        let page = doc(
            "https://copr.example.org/coprs/alice/tools/",
            r#"<div><div><h3 class="panel-title">Packages</h3></div><div class="list-group"><a href="x">x</a></div></div>"#,
        );
        let err = extract_last_build(&page).unwrap_err();
        assert_eq!(err.to_string(), "last build not found");
    }

    #[test]
    fn last_build_link_without_href_is_not_found() {
        let page = doc(
            "https://copr.example.org/coprs/alice/tools/",
            r#"<div><div><h3 class="panel-title">Last Build</h3></div><div class="list-group"><a>none</a></div></div>"#,
        );
        assert!(extract_last_build(&page).is_err());
    }

    #[test]
    fn last_build_skips_panel_without_href_and_takes_next_one() {
        let page = doc(
            "https://copr.example.org/coprs/alice/tools/",
            r#"<div>
                 <div><h3 class="panel-title">Last Build</h3></div>
                 <div class="list-group"><a>pending</a></div>
               </div>
               <div>
                 <div><h3 class="panel-title">Last Build</h3></div>
                 <div class="list-group"><a href="/build/2/">#2</a></div>
               </div>"#,
        );
        let build = extract_last_build(&page).unwrap();
        assert_eq!(build.as_str(), "https://copr.example.org/build/2/");
    }

    #[test]
    fn last_build_requires_container_directly_after_heading_parent() {
        let page = doc(
            "https://copr.example.org/coprs/alice/tools/",
            r#"<div>
                 <div><h3 class="panel-title">Last Build</h3></div>
                 <p>spacer</p>
                 <div class="list-group"><a href="/build/1/">#1</a></div>
               </div>"#,
        );
        assert!(extract_last_build(&page).is_err());
    }

    const BUILD: &str = r#"
<html><body>
  <div class="panel">
    <div class="panel-heading"><h3 class="panel-title">Results</h3></div>
    <div class="panel-body">
      <table>
        <tr><th>Chroot</th><th>State</th></tr>
        <tr><td><a href="https://download.example.org/results/alice/tools/fedora-40-x86_64/07312-tools/">fedora-40-x86_64</a></td><td><a href="/log/">log</a></td></tr>
        <tr><td><a>no href</a></td><td>failed</td></tr>
        <tr><td><a href="../../results/fedora-40-aarch64/">fedora-40-aarch64</a></td><td>succeeded</td></tr>
      </table>
    </div>
  </div>
</body></html>"#;

    #[test]
    fn result_indexes_in_row_order_skipping_missing_href() {
        let page = doc("https://copr.example.org/coprs/alice/tools/build/7312/", BUILD);
        let indexes = extract_result_indexes(&page).unwrap();
        let got: Vec<&str> = indexes.iter().map(|i| i.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "https://download.example.org/results/alice/tools/fedora-40-x86_64/07312-tools/",
                "https://copr.example.org/coprs/alice/tools/results/fedora-40-aarch64/",
            ]
        );
    }

    #[test]
    fn result_indexes_empty_table_is_resolve_error() {
        let page = doc(
            "https://copr.example.org/build/1/",
            r#"<div><div><h3 class="panel-title">Results</h3></div><div class="panel-body"><table><tr><th>Chroot</th></tr></table></div></div>"#,
        );
        let err = extract_result_indexes(&page).unwrap_err();
        assert_eq!(err.to_string(), "no results found");
    }

    const INDEX: &str = r#"
<html><body><table>
  <tr><td class="n"><a href="../">Parent Directory</a></td></tr>
  <tr><td class="n"><a href="tools-1.2-1.fc40.src.rpm">tools-1.2-1.fc40.src.rpm</a></td></tr>
  <tr><td class="n"><a href="builder-live.log.gz">builder-live.log.gz</a></td></tr>
  <tr><td class="n"><a>orphan</a></td></tr>
  <tr><td class="n"><a href="tools-1.2-1.fc40.x86_64.rpm">tools-1.2-1.fc40.x86_64.rpm</a></td></tr>
  <tr><td class="n"><a href="TOOLS.RPM">upper case</a></td></tr>
  <tr><td class="m"><a href="other.rpm">wrong column</a></td></tr>
</table></body></html>"#;

    #[test]
    fn artifacts_filtered_by_extension_and_resolved() {
        let page = doc("https://download.example.org/results/fedora-40-x86_64/07312-tools/", INDEX);
        let artifacts = extract_artifacts(&page, ".rpm");
        let got: Vec<&str> = artifacts.iter().map(|a| a.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "https://download.example.org/results/fedora-40-x86_64/07312-tools/tools-1.2-1.fc40.src.rpm",
                "https://download.example.org/results/fedora-40-x86_64/07312-tools/tools-1.2-1.fc40.x86_64.rpm",
            ]
        );
    }

    #[test]
    fn artifacts_with_other_extension() {
        let page = doc("https://download.example.org/results/x/", INDEX);
        let artifacts = extract_artifacts(&page, ".log.gz");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name(), Some("builder-live.log.gz"));
    }

    #[test]
    fn layout_selectors_parse() {
        for css in [
            layout::PANEL_HEADING,
            layout::LAST_BUILD_CONTAINER,
            layout::LAST_BUILD_LINK,
            layout::RESULTS_CONTAINER,
            layout::RESULT_INDEX_LINK,
            layout::ARTIFACT_LINK,
        ] {
            assert!(Selector::parse(css).is_ok(), "{css} should parse");
        }
    }
}
