use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use stowage_config::ExtraFile;
use stowage_template::Template;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ExtraFilesError;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Resolve extra file patterns into `upload name -> path` pairs.
///
/// Each glob is rendered through `template` before matching. A match is
/// uploaded under its file name, or under its rendered `name_template` when
/// one is set. When two patterns produce the same name the later one wins.
pub fn find_extra_files(
  template: &dyn Template,
  extra_files: &[ExtraFile],
) -> Result<BTreeMap<String, PathBuf>, ExtraFilesError> {
  let mut files = BTreeMap::new();

  for extra in extra_files {
    let pattern = template.apply(&extra.glob)?;
    let matches = glob(&pattern)?;

    if matches.is_empty() {
      warn!(glob = %pattern, "no files matched");
      continue;
    }

    let named = match &extra.name_template {
      Some(name_template) => {
        if matches.len() > 1 {
          return Err(ExtraFilesError::MultipleMatches {
            pattern,
            count: matches.len(),
          });
        }
        vec![(template.apply(name_template)?, matches[0].clone())]
      }
      None => matches
        .into_iter()
        .map(|path| (file_name(&path), path))
        .collect(),
    };

    for (name, path) in named {
      debug!(name = %name, path = %path.display(), "found extra file");
      if let Some(previous) = files.insert(name.clone(), path) {
        warn!(
          name = %name,
          previous = %previous.display(),
          "extra file overridden by a later pattern"
        );
      }
    }
  }

  Ok(files)
}

fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Regular files matching `pattern`, in path order.
///
/// The walk starts at the directory above the first wildcard and only
/// descends as deep as the pattern reaches, unless it contains `**`.
/// Symlinks are not descended into; a link to a file counts as that file and
/// a dangling link is skipped. Entries that cannot be read are skipped unless
/// they would have matched.
fn glob(pattern: &str) -> Result<Vec<PathBuf>, ExtraFilesError> {
  let matcher = GlobBuilder::new(pattern)
    .literal_separator(true)
    .build()
    .map_err(|source| ExtraFilesError::InvalidGlob {
      pattern: pattern.to_string(),
      source,
    })?
    .compile_matcher();

  let (root, depth) = literal_prefix(pattern);
  let relative = root.as_os_str().is_empty();
  let walk_root = if relative { Path::new(".") } else { root.as_path() };
  if fs::symlink_metadata(walk_root).is_err() {
    return Ok(Vec::new());
  }

  let mut walker = WalkDir::new(walk_root)
    .follow_links(false)
    .sort_by(|a, b| a.file_name().cmp(b.file_name()));
  if let Some(depth) = depth {
    walker = walker.max_depth(depth);
  }

  let strip = |path: &Path| -> PathBuf {
    if relative {
      path.strip_prefix(".").unwrap_or(path).to_path_buf()
    } else {
      path.to_path_buf()
    }
  };

  let mut matches = Vec::new();
  for entry in walker {
    let entry = match entry {
      Ok(entry) => entry,
      Err(e) => {
        let wanted = e.path().is_some_and(|p| matcher.is_match(strip(p)));
        if wanted {
          return Err(ExtraFilesError::Walk {
            pattern: pattern.to_string(),
            source: e,
          });
        }
        debug!(glob = %pattern, error = %e, "skipping unreadable entry");
        continue;
      }
    };

    let path = strip(entry.path());
    if !matcher.is_match(&path) {
      continue;
    }

    let file_type = entry.file_type();
    let is_file = if file_type.is_symlink() {
      match fs::metadata(entry.path()) {
        Ok(target) => target.is_file(),
        Err(e) => {
          warn!(path = %path.display(), error = %e, "skipping broken symlink");
          false
        }
      }
    } else {
      file_type.is_file()
    };
    if is_file {
      matches.push(path);
    }
  }

  Ok(matches)
}

/// The literal directory a pattern starts from, and how many levels below it
/// the pattern reaches (`None` when `**` makes it unbounded).
fn literal_prefix(pattern: &str) -> (PathBuf, Option<usize>) {
  if !pattern.contains(GLOB_META) {
    return (PathBuf::from(pattern), Some(0));
  }

  let segments: Vec<&str> = pattern.split('/').collect();
  let mut prefix = PathBuf::new();
  if pattern.starts_with('/') {
    prefix.push("/");
  }

  let mut literal = 0;
  for (i, segment) in segments.iter().enumerate() {
    // The last segment names files, not a directory to descend into.
    if segment.contains(GLOB_META) || i + 1 == segments.len() {
      literal = i;
      break;
    }
    if !segment.is_empty() {
      prefix.push(segment);
    }
  }

  let depth = if pattern.contains("**") {
    None
  } else {
    Some(segments[literal..].iter().filter(|s| !s.is_empty()).count())
  };
  (prefix, depth)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_literal_prefix() {
    assert_eq!(literal_prefix("dist/*.txt"), (PathBuf::from("dist"), Some(1)));
    assert_eq!(literal_prefix("dist/**/*.sig"), (PathBuf::from("dist"), None));
    assert_eq!(literal_prefix("*.md"), (PathBuf::new(), Some(1)));
    assert_eq!(
      literal_prefix("/tmp/out/*.json"),
      (PathBuf::from("/tmp/out"), Some(1))
    );
    assert_eq!(literal_prefix("dist/*/bin/app"), (PathBuf::from("dist"), Some(3)));
    assert_eq!(
      literal_prefix("docs/README.md"),
      (PathBuf::from("docs/README.md"), Some(0))
    );
  }
}
