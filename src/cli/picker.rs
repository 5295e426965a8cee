//! Interactive sales file picker (`--pick`).
//!
//! Kept separate from clap parsing: clap handles structured flags, the picker
//! provides the "run `sales --pick` and choose a file" UX.
//!
//! The picker searches for `*.csv` and `*.xlsx` files under the current
//! working directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::TableFormat;

/// Default directory recursion depth for finding sales files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to select a sales file from the current directory tree.
///
/// Accepts either a number from the list or an explicit path; `q` cancels.
pub fn prompt_for_sales_file() -> Result<PathBuf, AppError> {
    let files = discover_sales_files(Path::new("."));
    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No .csv or .xlsx files found. Provide one with `sales -f <file>`.",
        ));
    }

    println!("Found {} sales file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(4, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::new(4, format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::new(2, "No input received. Provide a file with `sales -f <file>`."));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_sales_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_sales_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the path points to an existing `.csv`/`.xlsx` file.
pub fn validate_sales_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(2, format!("Sales file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    TableFormat::from_name(&path.to_string_lossy())?;
    Ok(path.to_path_buf())
}

/// Discover sales files under `root` (deterministic order).
pub fn discover_sales_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_files_inner(root, 0, DEFAULT_SEARCH_DEPTH, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_files_inner(&path, depth + 1, max_depth, out);
            }
            continue;
        }

        if file_type.is_file() && TableFormat::from_name(&path.to_string_lossy()).is_ok() {
            out.push(path);
        }
    }
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}
