use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use webp_convert_core::SourceFormat;

use crate::error::BatchError;

/// Collect all convertible images from the input path.
/// If `recursive` is true, walk subdirectories.
pub fn collect_files(input: &Path, recursive: bool) -> Result<Vec<PathBuf>, BatchError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    if !input.is_dir() {
        return Err(BatchError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files = Vec::new();
    for entry in WalkDir::new(input).max_depth(max_depth).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if SourceFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }

    Ok(files)
}

/// Resolve the WebP output path for a given input file.
///
/// Without `output_base` the result sits next to the input. A single input
/// file with an output path that has an extension writes exactly there;
/// otherwise the output is a directory mirroring the input structure.
pub fn resolve_output(input_file: &Path, input_base: &Path, output_base: Option<&Path>) -> PathBuf {
    match output_base {
        None => webp_name(input_file),
        Some(out) => {
            if input_base.is_file() {
                if out.extension().is_some() {
                    out.to_path_buf()
                } else {
                    out.join(webp_name(Path::new(input_file.file_name().unwrap_or_default())))
                }
            } else {
                let relative = input_file.strip_prefix(input_base).unwrap_or(input_file);
                out.join(webp_name(relative))
            }
        }
    }
}

/// Pair each input with its output path. Inputs whose outputs coincide
/// (`a.jpg` and `a.png` both map to `a.webp`) get an error naming the
/// other inputs instead of a path.
pub fn plan_outputs(
    files: &[PathBuf],
    input_base: &Path,
    output_base: Option<&Path>,
) -> Vec<(PathBuf, Result<PathBuf, String>)> {
    let outputs: Vec<PathBuf> = files
        .iter()
        .map(|f| resolve_output(f, input_base, output_base))
        .collect();

    let mut claims: HashMap<&PathBuf, Vec<&PathBuf>> = HashMap::new();
    for (file, out) in files.iter().zip(&outputs) {
        claims.entry(out).or_default().push(file);
    }

    files
        .iter()
        .zip(&outputs)
        .map(|(file, out)| {
            let others: Vec<String> = claims[out]
                .iter()
                .filter(|other| **other != file)
                .map(|other| other.display().to_string())
                .collect();
            let planned = if others.is_empty() {
                Ok(out.clone())
            } else {
                Err(format!(
                    "output {} collides with {}",
                    out.display(),
                    others.join(", ")
                ))
            };
            (file.clone(), planned)
        })
        .collect()
}

/// `photo.jpg` → `photo.webp`
fn webp_name(path: &Path) -> PathBuf {
    path.with_extension("webp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_output_next_to_input() {
        let out = resolve_output(Path::new("pics/a.JPG"), Path::new("pics"), None);
        assert_eq!(out, PathBuf::from("pics/a.webp"));
    }

    #[test]
    fn test_resolve_output_single_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        fs::write(&input, b"x").unwrap();

        assert_eq!(
            resolve_output(&input, &input, Some(Path::new("out/custom.webp"))),
            PathBuf::from("out/custom.webp")
        );
        assert_eq!(
            resolve_output(&input, &input, Some(Path::new("out"))),
            PathBuf::from("out/a.webp")
        );
    }

    #[test]
    fn test_resolve_output_mirrors_directories() {
        let out = resolve_output(
            Path::new("/in/sub/b.jpeg"),
            Path::new("/in"),
            Some(Path::new("/out")),
        );
        assert_eq!(out, PathBuf::from("/out/sub/b.webp"));
    }

    #[test]
    fn test_collect_files_filters_and_recurses() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        for name in ["a.jpg", "b.gif", "c.PNG", "sub/d.jpeg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let flat = collect_files(dir.path(), false).unwrap();
        assert_eq!(flat, vec![dir.path().join("a.jpg"), dir.path().join("c.PNG")]);

        let deep = collect_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("sub/d.jpeg")));
    }

    #[test]
    fn test_plan_outputs_flags_colliding_names() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "a.png", "b.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = collect_files(dir.path(), false).unwrap();

        let plan = plan_outputs(&files, dir.path(), None);
        assert_eq!(plan.len(), 3);

        let a_jpg = &plan[0];
        assert_eq!(a_jpg.0, dir.path().join("a.jpg"));
        let err = a_jpg.1.as_ref().unwrap_err();
        assert!(err.contains("collides with"), "{err}");
        assert!(err.contains("a.png"), "{err}");

        assert!(plan[1].1.is_err());
        assert_eq!(plan[2].1.as_ref().unwrap(), &dir.path().join("b.webp"));
    }

    #[test]
    fn test_collect_files_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = collect_files(&dir.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, BatchError::InputNotFound { .. }));
    }
}
