//! Shader Programs
//!
//! A [`ShaderProgram`] is a set of WGSL modules, one file per pipeline stage,
//! each with entry point `main`.
//!
//! Sources go through two steps before a module is created:
//!
//! 1. `#include "file"` expansion, relative to the including file's directory.
//!    Included text is pasted verbatim and not scanned again, and repeated
//!    includes are expanded at every occurrence.
//! 2. `naga` parse + validation, so that errors surface as a logged message
//!    with the stage name instead of a device error.
//!
//! A program that fails either step is left unusable. Renderers check
//! [`ShaderProgram::is_usable`] and skip their draws; setup code that cannot
//! run without the program calls [`ShaderProgram::require_usable`].

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::errors::{PbrError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }

    fn to_naga(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
            Self::Compute => naga::ShaderStage::Compute,
        }
    }
}

/// Name of the entry point every stage file must define.
pub const ENTRY_POINT: &str = "main";

// ============================================================================
// Preprocessing
// ============================================================================

fn parse_include(line: &str) -> Option<std::result::Result<&str, ()>> {
    let rest = line.trim_start().strip_prefix("#include")?;
    let rest = rest.trim();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'');
    let Some(quote) = quote else {
        return Some(Err(()));
    };
    let inner = &rest[1..];
    match inner.find(quote) {
        Some(end) if end > 0 && inner[end + 1..].trim().is_empty() => Some(Ok(&inner[..end])),
        _ => Some(Err(())),
    }
}

/// Expands `#include` directives in `source`.
///
/// `stage` names the source in error messages. Lines that are `//` comments
/// are never treated as directives.
pub fn expand_includes(source: &str, base_dir: &Path, stage: &str) -> Result<String> {
    let mut out = String::with_capacity(source.len());

    for (index, line) in source.lines().enumerate() {
        if line.trim_start().starts_with("//") {
            out.push_str(line);
            out.push('\n');
            continue;
        }

        match parse_include(line) {
            None => {
                out.push_str(line);
                out.push('\n');
            }
            Some(Ok(file)) => {
                let path = base_dir.join(file);
                let text = std::fs::read_to_string(&path).map_err(|err| PbrError::ShaderCompile {
                    stage: stage.to_string(),
                    log: format!("line {}: cannot include '{}': {err}", index + 1, path.display()),
                })?;
                out.push_str(&text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
            Some(Err(())) => {
                return Err(PbrError::ShaderCompile {
                    stage: stage.to_string(),
                    log: format!("line {}: malformed include directive: {}", index + 1, line.trim()),
                });
            }
        }
    }

    Ok(out)
}

/// Reads a stage file and expands its includes.
pub fn read_shader_file(path: &Path) -> Result<String> {
    let stage = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|err| PbrError::ShaderCompile {
        stage: stage.clone(),
        log: format!("cannot read shader file: {err}"),
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    expand_includes(&source, base_dir, &stage)
}

/// Parses and validates WGSL, and checks that `main` exists for `stage`.
pub fn validate_wgsl(source: &str, stage: ShaderStage, label: &str) -> Result<()> {
    let compile_error = |log: String| PbrError::ShaderCompile {
        stage: format!("{label} ({})", stage.name()),
        log,
    };

    let module = naga::front::wgsl::parse_str(source).map_err(|err| compile_error(err.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|err| compile_error(err.to_string()))?;

    let naga_stage = stage.to_naga();
    if !module
        .entry_points
        .iter()
        .any(|ep| ep.name == ENTRY_POINT && ep.stage == naga_stage)
    {
        return Err(compile_error(format!(
            "missing {} entry point '{ENTRY_POINT}'",
            stage.name()
        )));
    }
    Ok(())
}

// ============================================================================
// Program
// ============================================================================

/// Validated shader modules for one pipeline.
#[derive(Debug, Default)]
pub struct ShaderProgram {
    label: String,
    modules: Vec<(ShaderStage, wgpu::ShaderModule)>,
    error: Option<String>,
}

impl ShaderProgram {
    /// Loads one file per stage. Failures are logged and leave the program unusable.
    #[must_use]
    pub fn from_files(device: &wgpu::Device, label: &str, stages: &[(ShaderStage, PathBuf)]) -> Self {
        let sources: Result<Vec<(ShaderStage, String)>> = stages
            .iter()
            .map(|(stage, path)| read_shader_file(path).map(|source| (*stage, source)))
            .collect();

        match sources {
            Ok(sources) => Self::from_sources(device, label, &sources),
            Err(err) => Self::failed(label, &err),
        }
    }

    /// Builds a program from already preprocessed sources.
    #[must_use]
    pub fn from_sources(device: &wgpu::Device, label: &str, sources: &[(ShaderStage, String)]) -> Self {
        for (stage, source) in sources {
            if let Err(err) = validate_wgsl(source, *stage, label) {
                return Self::failed(label, &err);
            }
        }

        let modules = sources
            .iter()
            .map(|(stage, source)| {
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&format!("{label} {}", stage.name())),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source.as_str())),
                });
                (*stage, module)
            })
            .collect();

        log::debug!("Shader program '{label}' ready");
        Self {
            label: label.to_string(),
            modules,
            error: None,
        }
    }

    fn failed(label: &str, err: &PbrError) -> Self {
        log::error!("Shader program '{label}' is unusable: {err}");
        Self {
            label: label.to_string(),
            modules: Vec::new(),
            error: Some(err.to_string()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.modules.is_empty()
    }

    #[must_use]
    pub fn module(&self, stage: ShaderStage) -> Option<&wgpu::ShaderModule> {
        self.modules
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, module)| module)
    }

    /// Like [`Self::module`], failing with the program's error for setup code.
    pub fn require_module(&self, stage: ShaderStage) -> Result<&wgpu::ShaderModule> {
        self.require_usable()?;
        self.module(stage).ok_or_else(|| PbrError::ShaderCompile {
            stage: self.label.clone(),
            log: format!("program has no {} stage", stage.name()),
        })
    }

    /// The failure message of an unusable program.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Setup-time check: an unusable program becomes a [`PbrError::ShaderCompile`].
    pub fn require_usable(&self) -> Result<()> {
        if self.is_usable() {
            return Ok(());
        }
        Err(PbrError::ShaderCompile {
            stage: self.label.clone(),
            log: self
                .error
                .clone()
                .unwrap_or_else(|| "program was released".to_string()),
        })
    }

    /// Drops the modules. Returns `false` if the program was already unusable.
    pub fn release(&mut self) -> bool {
        let had_modules = !self.modules.is_empty();
        self.modules.clear();
        had_modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scratch_dir() -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "pbr-asteroid-shader-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn include_is_expanded_relative_to_base() {
        let dir = scratch_dir();
        std::fs::write(dir.join("common.wgsl"), "const PI: f32 = 3.14159;\n").unwrap();

        let out = expand_includes("#include \"common.wgsl\"\nfn f() {}\n", &dir, "test").unwrap();
        assert_eq!(out, "const PI: f32 = 3.14159;\nfn f() {}\n");
    }

    #[test]
    fn single_quotes_and_repeated_includes() {
        let dir = scratch_dir();
        std::fs::write(dir.join("a.wgsl"), "// a").unwrap();

        let out = expand_includes("#include 'a.wgsl'\n#include \"a.wgsl\"\n", &dir, "test").unwrap();
        assert_eq!(out.matches("// a").count(), 2);
    }

    #[test]
    fn included_text_is_not_rescanned() {
        let dir = scratch_dir();
        std::fs::write(dir.join("self.wgsl"), "#include \"self.wgsl\"\n").unwrap();

        let out = expand_includes("#include \"self.wgsl\"\n", &dir, "test").unwrap();
        assert_eq!(out, "#include \"self.wgsl\"\n");
    }

    #[test]
    fn commented_directive_is_ignored() {
        let out = expand_includes("// #include \"nope.wgsl\"\n", Path::new("."), "test").unwrap();
        assert_eq!(out, "// #include \"nope.wgsl\"\n");
    }

    #[test]
    fn missing_and_malformed_includes_fail() {
        let dir = scratch_dir();
        let missing = expand_includes("#include \"missing.wgsl\"\n", &dir, "test");
        assert!(matches!(missing, Err(PbrError::ShaderCompile { .. })));

        for bad in ["#include common.wgsl", "#include \"unterminated", "#include \"\""] {
            let result = expand_includes(bad, &dir, "test");
            assert!(
                matches!(result, Err(PbrError::ShaderCompile { .. })),
                "expected failure for {bad:?}"
            );
        }
    }

    #[test]
    fn validation_checks_entry_point_stage() {
        let compute = "@compute @workgroup_size(1) fn main() {}";
        assert!(validate_wgsl(compute, ShaderStage::Compute, "ok").is_ok());

        let err = validate_wgsl(compute, ShaderStage::Vertex, "wrong").unwrap_err();
        assert!(err.to_string().contains("entry point"));
    }

    #[test]
    fn validation_reports_parse_errors() {
        let err = validate_wgsl("fn main( {", ShaderStage::Fragment, "broken").unwrap_err();
        match err {
            PbrError::ShaderCompile { stage, .. } => assert_eq!(stage, "broken (fragment)"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn default_program_is_unusable() {
        let program = ShaderProgram::default();
        assert!(!program.is_usable());
        assert!(program.require_usable().is_err());
        assert!(program.module(ShaderStage::Vertex).is_none());
    }
}
