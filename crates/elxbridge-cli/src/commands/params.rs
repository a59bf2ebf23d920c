//! Params command implementation
//!
//! Inspects and edits parameter files.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use elxbridge_params::{get_line, get_value, quoted, remove as remove_key, replace, Preset};

/// Prints a preset's parameter text.
pub fn show(preset: Preset) -> Result<ExitCode> {
    print!("{}", preset.text());
    Ok(ExitCode::SUCCESS)
}

/// Prints the values of `key`, one per line.
pub fn get(file: &Path, key: &str, raw: bool) -> Result<ExitCode> {
    let text = read(file)?;
    let found = if raw {
        get_line(&text, key).map(|line| vec![line.to_string()])
    } else {
        get_value(&text, key)
    };
    match found {
        Some(values) => {
            for value in values {
                println!("{}", value);
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("{} {} not set in {}", "!!".yellow(), key, file.display());
            Ok(ExitCode::from(1))
        }
    }
}

/// Sets `key` and writes the result to `output`, or stdout.
pub fn set(file: &Path, key: &str, values: &[String], quote: bool, output: Option<&Path>) -> Result<ExitCode> {
    let mut text = read(file)?;
    replace(&mut text, key, &format_values(values, quote));
    emit(&text, output)
}

/// Removes `key` and writes the result to `output`, or stdout.
pub fn remove(file: &Path, key: &str, output: Option<&Path>) -> Result<ExitCode> {
    let mut text = read(file)?;
    remove_key(&mut text, key);
    emit(&text, output)
}

fn format_values(values: &[String], quote: bool) -> String {
    if !quote {
        return values.join(" ");
    }
    values.iter().map(|v| quoted(v)).collect::<Vec<_>>().join(" ")
}

fn read(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read parameter file: {}", file.display()))
}

fn emit(text: &str, output: Option<&Path>) -> Result<ExitCode> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "wrote".green(), path.display());
        }
        None => print!("{}", text),
    }
    Ok(ExitCode::SUCCESS)
}
