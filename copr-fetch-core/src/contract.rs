//! # contract: data passed between pipeline stages, and the page fetching seam
//!
//! Every stage of discovery reads pages through the [`PageFetcher`] trait so the
//! stages can be exercised against canned HTML in tests. The reference
//! newtypes keep the stage boundaries explicit: a [`BuildReference`] can only
//! come out of the build resolver, an [`ArtifactReference`] only out of the
//! artifact lister.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, exported behind the
//!   `test-export-mocks` feature so integration tests can use `MockPageFetcher`.

use std::fmt;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::FetchError;

/// A fetched page together with the location it was actually served from.
///
/// The body is kept as text and parsed on demand, so a `Document` stays
/// `Send` and can cross await points freely.
#[derive(Debug, Clone)]
pub struct Document {
    location: Url,
    body: String,
}

impl Document {
    pub fn new(location: Url, body: impl Into<String>) -> Self {
        Self {
            location,
            body: body.into(),
        }
    }

    /// Effective location, after redirects.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Parse the body into a CSS-selector-queryable tree.
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }

    /// Resolve a link found inside this document.
    pub fn resolve(&self, href: &str) -> Result<Url, url::ParseError> {
        self.location.join(href)
    }
}

macro_rules! location_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(Url);

        impl $name {
            pub fn new(location: Url) -> Self {
                Self(location)
            }

            pub fn url(&self) -> &Url {
                &self.0
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

location_newtype!(
    /// Page of the most recent build of a repository.
    BuildReference
);

location_newtype!(
    /// Directory listing of one build result (one chroot / architecture).
    ResultIndexReference
);

location_newtype!(
    /// Absolute location of one downloadable package file.
    ArtifactReference
);

impl ArtifactReference {
    /// Final path segment, used as the local file name.
    pub fn file_name(&self) -> Option<&str> {
        last_segment(&self.0)
    }
}

/// Final non-empty path segment of `location`, if any.
pub(crate) fn last_segment(location: &Url) -> Option<&str> {
    location
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
}

/// Retrieves pages for the discovery stages.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `location` and return its body with the effective location.
    async fn fetch(&self, location: &Url) -> Result<Document, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(s: &str) -> ArtifactReference {
        ArtifactReference::new(Url::parse(s).unwrap())
    }

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(
            artifact("https://example.org/results/fedora-40-x86_64/00123-pkg/pkg-1.0-1.fc40.x86_64.rpm")
                .file_name(),
            Some("pkg-1.0-1.fc40.x86_64.rpm")
        );
        assert_eq!(
            artifact("https://example.org/a.rpm?download=1").file_name(),
            Some("a.rpm")
        );
    }

    #[test]
    fn directory_location_has_no_file_name() {
        assert_eq!(artifact("https://example.org/results/").file_name(), None);
        assert_eq!(artifact("https://example.org").file_name(), None);
    }

    #[test]
    fn document_resolves_relative_links_against_its_location() {
        let doc = Document::new(
            Url::parse("https://example.org/coprs/alice/tools/").unwrap(),
            "<html></html>",
        );
        assert_eq!(
            doc.resolve("build/42/").unwrap().as_str(),
            "https://example.org/coprs/alice/tools/build/42/"
        );
        assert_eq!(
            doc.resolve("/coprs/build/7/").unwrap().as_str(),
            "https://example.org/coprs/build/7/"
        );
        assert_eq!(
            doc.resolve("https://cdn.example.org/x.rpm").unwrap().as_str(),
            "https://cdn.example.org/x.rpm"
        );
    }
}
