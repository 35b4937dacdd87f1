use crate::{Artifact, ArtifactKind};

/// A predicate over artifacts.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  /// Artifacts of the given kind.
  ByKind(ArtifactKind),
  /// Artifacts built by one of the given IDs.
  ///
  /// Checksums and source archives cover every build, so they always match.
  ByIds(Vec<String>),
  /// Artifacts matching any of the filters. Empty matches everything.
  Or(Vec<Filter>),
  /// Artifacts matching all of the filters. Empty matches everything.
  And(Vec<Filter>),
}

impl Filter {
  pub fn by_kinds(kinds: impl IntoIterator<Item = ArtifactKind>) -> Self {
    Filter::Or(kinds.into_iter().map(Filter::ByKind).collect())
  }

  pub fn and(self, other: Filter) -> Self {
    match self {
      Filter::And(mut filters) => {
        filters.push(other);
        Filter::And(filters)
      }
      filter => Filter::And(vec![filter, other]),
    }
  }

  pub fn matches(&self, artifact: &Artifact) -> bool {
    match self {
      Filter::ByKind(kind) => artifact.kind == *kind,
      Filter::ByIds(ids) => {
        matches!(
          artifact.kind,
          ArtifactKind::Checksum | ArtifactKind::UploadableSourceArchive
        ) || artifact
          .id
          .as_ref()
          .is_some_and(|id| ids.iter().any(|wanted| wanted == id))
      }
      Filter::Or(filters) => filters.is_empty() || filters.iter().any(|f| f.matches(artifact)),
      Filter::And(filters) => filters.iter().all(|f| f.matches(artifact)),
    }
  }
}
