//! Round-trip tests for the tar archive builder, read back with `tar::Archive`.

use std::fs::{self, File};
use std::path::Path;

use chrono::{TimeZone, Utc};
use stowage_archive::{ArchiveError, FileEntry, FileInfo, TarArchive};
use tempfile::TempDir;

/// Lay out a small tree:
///
/// ```text
/// foo.txt
/// sub1/
/// sub1/bar.txt
/// sub1/executable   (0755)
/// regular.txt
/// link.txt     -> regular.txt
/// badlink.txt  -> nope.txt
/// ```
fn fixture() -> TempDir {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  fs::write(root.join("foo.txt"), "foo").unwrap();
  fs::create_dir(root.join("sub1")).unwrap();
  fs::write(root.join("sub1/bar.txt"), "bar").unwrap();
  fs::write(root.join("sub1/executable"), "#!/bin/sh\necho hi\n").unwrap();
  fs::write(root.join("regular.txt"), "regular").unwrap();

  #[cfg(unix)]
  {
    use std::os::unix::fs::{PermissionsExt, symlink};
    fs::set_permissions(root.join("sub1/executable"), fs::Permissions::from_mode(0o755)).unwrap();
    symlink("regular.txt", root.join("link.txt")).unwrap();
    symlink("nope.txt", root.join("badlink.txt")).unwrap();
  }

  dir
}

fn entry(root: &Path, name: &str) -> FileEntry {
  FileEntry::new(root.join(name), name)
}

#[cfg(unix)]
#[test]
fn test_tar_round_trip() {
  let fixture = fixture();
  let root = fixture.path();
  let out = tempfile::tempdir().unwrap();
  let archive_path = out.path().join("test.tar");

  let mut archive = TarArchive::new(File::create(&archive_path).unwrap());

  let missing = archive.add(&entry(root, "nope.txt")).unwrap_err();
  assert!(matches!(missing, ArchiveError::SourceNotFound { .. }));

  for name in [
    "foo.txt",
    "sub1",
    "sub1/bar.txt",
    "sub1/executable",
    "regular.txt",
    "link.txt",
    "badlink.txt",
  ] {
    archive.add(&entry(root, name)).unwrap();
  }

  archive.close().unwrap();
  let closed = archive.add(&entry(root, "foo.txt")).unwrap_err();
  assert!(matches!(closed, ArchiveError::ArchiveClosed));

  let size = fs::metadata(&archive_path).unwrap().len();
  assert!(size < 10_000, "archive should be small, got {} bytes", size);

  let mut reader = tar::Archive::new(File::open(&archive_path).unwrap());
  let mut paths = Vec::new();
  for next in reader.entries().unwrap() {
    let next = next.unwrap();
    let path = next.path().unwrap().to_string_lossy().to_string();
    let header = next.header();

    match path.as_str() {
      "sub1/executable" => {
        let mode = header.mode().unwrap();
        assert_eq!(mode & 0o111, 0o111, "executable bits lost: {:o}", mode);
      }
      "sub1" => {
        assert_eq!(header.entry_type(), tar::EntryType::Directory);
        assert_eq!(header.size().unwrap(), 0);
      }
      "link.txt" => {
        assert_eq!(header.entry_type(), tar::EntryType::Symlink);
        let target = next.link_name().unwrap().unwrap();
        assert_eq!(target.to_string_lossy(), "regular.txt");
      }
      "badlink.txt" => {
        let target = next.link_name().unwrap().unwrap();
        assert_eq!(target.to_string_lossy(), "nope.txt");
      }
      "foo.txt" => {
        assert_eq!(header.entry_type(), tar::EntryType::Regular);
        assert_eq!(header.size().unwrap(), 3);
      }
      _ => {}
    }
    paths.push(path);
  }

  assert_eq!(
    paths,
    vec![
      "foo.txt",
      "sub1",
      "sub1/bar.txt",
      "sub1/executable",
      "regular.txt",
      "link.txt",
      "badlink.txt",
    ]
  );
}

#[test]
fn test_tar_file_info_override() {
  let fixture = fixture();
  let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 45).unwrap();
  let out = tempfile::tempdir().unwrap();
  let archive_path = out.path().join("test.tar");

  let mut archive = TarArchive::new(File::create(&archive_path).unwrap());
  archive
    .add(
      &FileEntry::new(fixture.path().join("foo.txt"), "nope.txt").with_info(FileInfo {
        mode: Some(0o755),
        owner: Some("carlos".to_string()),
        group: Some("root".to_string()),
        mtime: Some(now),
      }),
    )
    .unwrap();
  archive.close().unwrap();

  let mut reader = tar::Archive::new(File::open(&archive_path).unwrap());
  let mut found = 0;
  for next in reader.entries().unwrap() {
    let next = next.unwrap();
    let header = next.header();
    found += 1;

    assert_eq!(next.path().unwrap().to_string_lossy(), "nope.txt");
    assert_eq!(header.mtime().unwrap(), now.timestamp() as u64);
    assert_eq!(header.mode().unwrap(), 0o755);
    assert_eq!(header.username().unwrap(), Some("carlos"));
    assert_eq!(header.groupname().unwrap(), Some("root"));
    assert_eq!(header.uid().unwrap(), 0);
    assert_eq!(header.gid().unwrap(), 0);
  }
  assert_eq!(found, 1);
}

#[test]
fn test_tar_uid_gid_zero_without_override() {
  let fixture = fixture();
  let mut buffer = Vec::new();
  {
    let mut archive = TarArchive::new(&mut buffer);
    archive.add(&entry(fixture.path(), "foo.txt")).unwrap();
    archive.close().unwrap();
  }

  let mut reader = tar::Archive::new(buffer.as_slice());
  for next in reader.entries().unwrap() {
    let next = next.unwrap();
    assert_eq!(next.header().uid().unwrap(), 0);
    assert_eq!(next.header().gid().unwrap(), 0);
  }
}

#[cfg(unix)]
#[test]
fn test_tar_invalid_link() {
  let fixture = fixture();
  let mut archive = TarArchive::new(std::io::sink());
  archive.add(&entry(fixture.path(), "badlink.txt")).unwrap();
  archive.close().unwrap();
}

#[test]
fn test_tar_close_is_idempotent() {
  let fixture = fixture();
  let mut buffer = Vec::new();
  {
    let mut archive = TarArchive::new(&mut buffer);
    archive.add(&entry(fixture.path(), "foo.txt")).unwrap();
    archive.close().unwrap();
    assert!(archive.is_closed());
    archive.close().unwrap();
  }

  // One header block, one padded data block and a single two-block trailer.
  assert_eq!(buffer.len(), 4 * 512);
  let trailer_start = 1024;
  assert!(buffer[trailer_start..].iter().all(|b| *b == 0));

  let mut reader = tar::Archive::new(buffer.as_slice());
  assert_eq!(reader.entries().unwrap().count(), 1);
}

#[test]
fn test_tar_missing_source_keeps_archive_usable() {
  let fixture = fixture();
  let mut buffer = Vec::new();
  {
    let mut archive = TarArchive::new(&mut buffer);
    let err = archive.add(&entry(fixture.path(), "missing.txt")).unwrap_err();
    assert!(matches!(err, ArchiveError::SourceNotFound { .. }));
    archive.add(&entry(fixture.path(), "regular.txt")).unwrap();
    archive.close().unwrap();
  }

  let mut reader = tar::Archive::new(buffer.as_slice());
  let paths: Vec<String> = reader
    .entries()
    .unwrap()
    .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
    .collect();
  assert_eq!(paths, vec!["regular.txt"]);
}

#[test]
fn test_tar_mtime_before_epoch_is_rejected() {
  let fixture = fixture();
  let mut buffer = Vec::new();
  {
    let mut archive = TarArchive::new(&mut buffer);
    let before_epoch = Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 0).unwrap();
    let err = archive
      .add(
        &FileEntry::new(fixture.path().join("foo.txt"), "foo.txt").with_info(FileInfo {
          mtime: Some(before_epoch),
          ..Default::default()
        }),
      )
      .unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidMtime { .. }));

    archive.add(&entry(fixture.path(), "regular.txt")).unwrap();
    archive.close().unwrap();
  }

  let mut reader = tar::Archive::new(buffer.as_slice());
  assert_eq!(reader.entries().unwrap().count(), 1);
}
