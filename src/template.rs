//! Templates under test and their configuration descriptors
//!
//! Template generation happens elsewhere; this module only lists the
//! generated files and reads the JSON descriptor stored next to each one.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Source of template file names.
pub trait TemplateProvider {
    /// File names (not paths) in `directory` ending with `extension`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn list_templates(&self, directory: &Path, extension: &str) -> Result<Vec<String>>;
}

/// Lists templates from the local file system, sorted by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTemplateProvider;

impl TemplateProvider for FsTemplateProvider {
    fn list_templates(&self, directory: &Path, extension: &str) -> Result<Vec<String>> {
        let mut templates = Vec::new();
        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(extension) {
                    templates.push(name.to_string());
                }
            }
        }
        templates.sort();
        Ok(templates)
    }
}

/// Experiment name for a template: everything before the last `.` segment.
///
/// `"case1.yaml"` becomes `"case1"`, `"a.b.yaml"` becomes `"a.b"`. A name
/// without any `.` is returned unchanged.
#[must_use]
pub fn experiment_name(template_file: &str) -> &str {
    template_file
        .rsplit_once('.')
        .map_or(template_file, |(stem, _)| stem)
}

/// Path of the configuration descriptor for a template.
#[must_use]
pub fn descriptor_path(directory: &Path, template_file: &str) -> PathBuf {
    directory.join(format!("{template_file}.json"))
}

/// Load the configuration descriptor (`<template_file>.json`).
///
/// # Errors
///
/// Returns [`Error::Descriptor`] if the file is missing, is not valid JSON or
/// is not a JSON object.
pub fn load_configuration(directory: &Path, template_file: &str) -> Result<Map<String, Value>> {
    let path = descriptor_path(directory, template_file);
    let descriptor = |reason: String| Error::Descriptor {
        path: path.clone(),
        reason,
    };

    let content = fs::read_to_string(&path).map_err(|e| descriptor(e.to_string()))?;
    match serde_json::from_str::<Value>(&content).map_err(|e| descriptor(e.to_string()))? {
        Value::Object(configuration) => Ok(configuration),
        other => Err(descriptor(format!("expected a JSON object, found {other}"))),
    }
}
