//! Run configuration and engine location resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{InputKind, Result, WorkbenchError};

/// Environment variable consulted when no explicit engine path is given.
pub const ENGINE_ENV_VAR: &str = "TLA2TOOLS_JAR";

/// Default Java launcher for archive engines.
pub const DEFAULT_JAVA: &str = "java";

/// Directory (relative to the spec directory) that holds run directories
/// when no output root is configured.
pub const DEFAULT_RUNS_SUBDIR: &str = ".tlaplus-workbench/runs";

/// Where the checking engine lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum EngineLocation {
    /// A `tla2tools.jar`, launched through the Java runtime.
    Archive(PathBuf),

    /// Anything else: executed directly with the TLC argument list.
    Executable(PathBuf),
}

impl EngineLocation {
    /// Classify a path by extension: `.jar` is an archive.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_jar = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("jar"))
            .unwrap_or(false);
        if is_jar {
            EngineLocation::Archive(path)
        } else {
            EngineLocation::Executable(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            EngineLocation::Archive(p) | EngineLocation::Executable(p) => p,
        }
    }
}

/// Resolve the engine location.
///
/// Priority: `explicit`, then `env_value` (the contents of
/// [`ENGINE_ENV_VAR`], passed in by the caller), then failure. An explicit
/// path that does not exist is an error; it never falls through to the
/// environment.
pub fn resolve_engine(
    explicit: Option<&Path>,
    env_value: Option<&str>,
) -> Result<EngineLocation> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(EngineLocation::from_path(path));
        }
        return Err(WorkbenchError::InputNotFound {
            kind: InputKind::Engine,
            path: path.to_path_buf(),
        });
    }

    let env_value = env_value.map(str::trim).filter(|v| !v.is_empty());
    if let Some(value) = env_value {
        let path = PathBuf::from(value);
        if path.is_file() {
            return Ok(EngineLocation::from_path(path));
        }
        return Err(WorkbenchError::EngineNotFound(format!(
            "${} points to {}, which is not a file",
            ENGINE_ENV_VAR, value
        )));
    }

    Err(WorkbenchError::EngineNotFound(format!(
        "set ${} or pass --jar",
        ENGINE_ENV_VAR
    )))
}

/// Resource bounds handed to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Worker threads (`-workers`). One keeps runs comparable.
    pub workers: u32,

    /// JVM heap ceiling in MiB (`-Xmx`). Ignored for executable engines.
    pub memory_mb: Option<u64>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            workers: 1,
            memory_mb: None,
        }
    }
}

/// Immutable input to one model-check run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Root `.tla` module.
    pub spec_path: PathBuf,

    /// Model configuration (`.cfg`).
    pub cfg_path: PathBuf,

    /// Resolved engine location.
    pub engine: EngineLocation,

    /// Java launcher used for archive engines.
    pub java: String,

    /// Worker and memory bounds.
    pub limits: ResourceLimits,

    /// Wall-clock timeout in seconds (0 = none).
    pub timeout_secs: u64,

    /// Root under which run directories are created.
    pub out_root: Option<PathBuf>,
}

impl RunConfig {
    /// Create a configuration; the cfg defaults to `<spec>.cfg`.
    pub fn new(
        spec_path: impl Into<PathBuf>,
        cfg_path: Option<PathBuf>,
        engine: EngineLocation,
    ) -> Self {
        let spec_path = spec_path.into();
        let cfg_path = cfg_path.unwrap_or_else(|| spec_path.with_extension("cfg"));
        Self {
            spec_path,
            cfg_path,
            engine,
            java: DEFAULT_JAVA.to_string(),
            limits: ResourceLimits::default(),
            timeout_secs: 0,
            out_root: None,
        }
    }

    pub fn with_workers(mut self, workers: u32) -> Self {
        self.limits.workers = workers.max(1);
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: Option<u64>) -> Self {
        self.limits.memory_mb = memory_mb;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_out_root(mut self, out_root: Option<PathBuf>) -> Self {
        self.out_root = out_root;
        self
    }

    pub fn with_java(mut self, java: impl Into<String>) -> Self {
        self.java = java.into();
        self
    }

    /// The configured timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Check that every input path resolves and compute derived locations.
    pub fn resolve(&self) -> Result<ResolvedInputs> {
        let spec_path = canonical_file(&self.spec_path, InputKind::Spec)?;
        let cfg_path = canonical_file(&self.cfg_path, InputKind::Config)?;
        let engine_path = canonical_file(self.engine.path(), InputKind::Engine)?;

        let spec_dir = spec_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            WorkbenchError::Setup(format!("{} has no parent directory", spec_path.display()))
        })?;
        let module = spec_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                WorkbenchError::Setup(format!("{} has no module name", spec_path.display()))
            })?;

        let out_root = match &self.out_root {
            Some(root) => absolutize(root)?,
            None => spec_dir.join(DEFAULT_RUNS_SUBDIR),
        };

        Ok(ResolvedInputs {
            engine: match self.engine {
                EngineLocation::Archive(_) => EngineLocation::Archive(engine_path),
                EngineLocation::Executable(_) => EngineLocation::Executable(engine_path),
            },
            spec_path,
            cfg_path,
            spec_dir,
            module,
            out_root,
        })
    }
}

/// Absolute, validated locations derived from a [`RunConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    pub spec_path: PathBuf,
    pub cfg_path: PathBuf,
    pub engine: EngineLocation,
    pub spec_dir: PathBuf,
    pub module: String,
    pub out_root: PathBuf,
}

impl ResolvedInputs {
    /// The `-config` argument: bare file name when the cfg sits beside the
    /// spec (TLC resolves it relative to its working directory).
    pub fn cfg_arg(&self) -> String {
        let beside_spec = self.cfg_path.parent() == Some(self.spec_dir.as_path());
        match self.cfg_path.file_name() {
            Some(name) if beside_spec => name.to_string_lossy().into_owned(),
            _ => self.cfg_path.to_string_lossy().into_owned(),
        }
    }
}

fn canonical_file(path: &Path, kind: InputKind) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(WorkbenchError::InputNotFound {
            kind,
            path: path.to_path_buf(),
        });
    }
    Ok(path.canonicalize()?)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
