//! Extract command implementation

use super::open_archive;
use crate::global_opts;
use crate::output::{self, verbose_println};
use anyhow::{bail, Context, Result};
use colored::*;
use mpq::Archive;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Serialize)]
struct ExtractResult {
    archive: String,
    output_dir: String,
    total_files: usize,
    extracted: usize,
    failed: usize,
    files: Vec<FileExtractResult>,
}

#[derive(Serialize)]
struct FileExtractResult {
    filename: String,
    output_path: String,
    size: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Extract one file, or every listed file, into `output_dir`
pub fn extract(archive_path: &str, output_dir: &Path, specific_file: Option<&str>) -> Result<()> {
    let opts = global_opts();
    let mut archive = open_archive(archive_path)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let names = match specific_file {
        Some(name) => vec![name.to_string()],
        None => archive
            .files()
            .context("Failed to list files (does the archive have a (listfile)?)")?,
    };

    let mut files = Vec::with_capacity(names.len());
    for name in &names {
        let output_path = build_output_path(output_dir, name);
        let outcome = extract_file(&mut archive, name, &output_path);

        let (size, status, error) = match outcome {
            Ok(size) => (size, "success", None),
            Err(e) => {
                log::warn!("Failed to extract {}: {:#}", name, e);
                (0, "failed", Some(format!("{:#}", e)))
            }
        };
        verbose_println(1, &format!("{} -> {} ({})", name, output_path.display(), status));

        files.push(FileExtractResult {
            filename: name.clone(),
            output_path: output_path.display().to_string(),
            size,
            status,
            error,
        });
    }

    let extracted = files.iter().filter(|f| f.error.is_none()).count();
    let result = ExtractResult {
        archive: archive_path.to_string(),
        output_dir: output_dir.display().to_string(),
        total_files: files.len(),
        extracted,
        failed: files.len() - extracted,
        files,
    };

    if !output::print_structured(&result)? && !opts.quiet {
        for file in &result.files {
            match &file.error {
                None => println!("{} {}", "✓".green(), file.filename),
                Some(error) => println!("{} {}: {}", "✗".red(), file.filename, error.red()),
            }
        }
        println!();
        println!(
            "{} {} of {} files to {}",
            "Extracted".bold(),
            result.extracted,
            result.total_files,
            result.output_dir.cyan()
        );
    }

    if specific_file.is_some() && result.failed > 0 {
        bail!("Failed to extract {}", names[0]);
    }
    Ok(())
}

fn extract_file(archive: &mut Archive, name: &str, output_path: &Path) -> Result<u64> {
    let data = archive
        .read_file(name)
        .with_context(|| format!("Failed to read {}", name))?;

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(output_path, &data)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    Ok(data.len() as u64)
}

/// Map an archive name onto a path below `output_dir`
///
/// Both separators split components; `..`, roots and drive prefixes are
/// dropped so the result never escapes `output_dir`.
fn build_output_path(output_dir: &Path, name: &str) -> PathBuf {
    let mut path = output_dir.to_path_buf();
    for part in name.split(['\\', '/']) {
        match Path::new(part).components().next() {
            Some(Component::Normal(_)) => path.push(part),
            _ => continue,
        }
    }
    path
}
