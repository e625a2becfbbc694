//! Directory helpers shared by the dataset codecs.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::HoplabelError;
use crate::geom::Size;

/// Image extensions tried when pairing a label with its image, in order of
/// preference.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];

/// Recursively lists files under `root` whose extension is in `extensions`
/// (case-insensitive), sorted by relative path.
pub fn collect_files_with_extensions(
    root: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, HoplabelError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| {
            HoplabelError::Io(std::io::Error::other(format!(
                "failed while traversing directory '{}': {source}",
                root.display()
            )))
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|path| rel_string(root, path));
    Ok(files)
}

pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// Finds the image in `images_dir` with the same relative stem as
/// `label_rel_path`.
pub fn find_image_for_label(images_dir: &Path, label_rel_path: &Path) -> Option<PathBuf> {
    let stem_rel_path = label_rel_path.with_extension("");
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(&stem_rel_path).with_extension(ext))
        .find(|candidate| candidate.is_file())
}

/// Puts `image` into `images_dir` as `<stem>.<ext>`, keeping the source
/// extension. Hard-links when possible and copies otherwise. An image that
/// is already in place is left alone.
pub fn place_image(image: &Path, images_dir: &Path, stem: &str) -> Result<PathBuf, HoplabelError> {
    let ext = image
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| IMAGE_EXTENSIONS[0].to_string());
    let dst = images_dir.join(stem).with_extension(ext);

    if !image.is_file() {
        return Err(HoplabelError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source image '{}' not found", image.display()),
        )));
    }
    if dst.is_file() && same_file(image, &dst) {
        return Ok(dst);
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(HoplabelError::Io)?;
    }
    if dst.exists() {
        fs::remove_file(&dst).map_err(HoplabelError::Io)?;
    }
    if let Err(err) = fs::hard_link(image, &dst) {
        log::debug!("hard link {} failed ({err}), copying", dst.display());
        fs::copy(image, &dst).map_err(HoplabelError::Io)?;
    }
    Ok(dst)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Reads the pixel size from an image header.
pub fn read_image_size(path: &Path) -> Result<Size, HoplabelError> {
    let size = imagesize::size(path).map_err(|source| HoplabelError::ImageSize {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size.width.try_into().map_err(|_| {
        HoplabelError::Io(std::io::Error::other(format!(
            "image width {} of '{}' does not fit in u32",
            size.width,
            path.display()
        )))
    })?;
    let height: u32 = size.height.try_into().map_err(|_| {
        HoplabelError::Io(std::io::Error::other(format!(
            "image height {} of '{}' does not fit in u32",
            size.height,
            path.display()
        )))
    })?;

    Ok(Size::new(width, height))
}

/// `path` relative to `root` with forward slashes.
pub fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// File stem as a string, empty when the path has none.
pub fn stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Shell-style match supporting `*` (any run) and `?` (any one char).
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn place_image_links_under_new_stem() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let src = temp.path().join("src/photo.png");
        fs::create_dir_all(src.parent().unwrap()).expect("create src dir");
        fs::write(&src, b"pixels").expect("write image");

        let images = temp.path().join("out/images");
        let placed = place_image(&src, &images, "0007").expect("place");
        assert_eq!(placed, images.join("0007.png"));
        assert_eq!(fs::read(&placed).expect("read placed"), b"pixels");

        // Placing again replaces the previous file.
        fs::write(&src, b"newer").expect("rewrite image");
        let again = place_image(&src, &images, "0007").expect("place again");
        assert_eq!(fs::read(again).expect("read placed"), b"newer");
    }

    #[test]
    fn place_image_keeps_image_already_in_place() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        fs::create_dir_all(&images).expect("create images dir");
        fs::write(images.join("a.jpg"), b"pixels").expect("write image");

        let placed = place_image(&images.join("a.jpg"), &images, "a").expect("place");
        assert_eq!(fs::read(placed).expect("read"), b"pixels");
    }

    #[test]
    fn place_image_reports_missing_source() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = place_image(&temp.path().join("nope.jpg"), temp.path(), "a").unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn collect_files_is_sorted_and_filtered() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("sub")).expect("create sub dir");
        fs::write(temp.path().join("b.txt"), "").expect("write b");
        fs::write(temp.path().join("a.TXT"), "").expect("write a");
        fs::write(temp.path().join("sub/c.txt"), "").expect("write c");
        fs::write(temp.path().join("d.json"), "").expect("write d");

        let files = collect_files_with_extensions(temp.path(), &["txt"]).expect("collect");
        let rels: Vec<String> = files.iter().map(|f| rel_string(temp.path(), f)).collect();
        assert_eq!(rels, vec!["a.TXT", "b.txt", "sub/c.txt"]);
    }

    #[test]
    fn find_image_prefers_extension_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("x.png"), b"dummy").expect("write png");
        fs::write(temp.path().join("x.jpg"), b"dummy").expect("write jpg");
        let found = find_image_for_label(temp.path(), Path::new("x.txt")).expect("image");
        assert!(found.ends_with("x.jpg"));
        assert!(find_image_for_label(temp.path(), Path::new("y.txt")).is_none());
    }

    #[test]
    fn wildcard() {
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("cam1_*", "cam1_0001"));
        assert!(!wildcard_match("cam1_*", "cam2_0001"));
        assert!(wildcard_match("a?c*", "abcdef"));
        assert!(wildcard_match("*01", "cam1_0001"));
        assert!(!wildcard_match("a?c", "ac"));
    }
}
