//! Shared fixtures: a spec workspace and fake engines written as shell scripts.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tlcrun_core::{EngineLocation, RunConfig};

pub const SPEC: &str = "\
---- MODULE Counter ----
EXTENDS Naturals
CONSTANT Max
VARIABLES x, y
Init == x = 0 /\\ y = 0
Next == x' = x + 1 /\\ UNCHANGED y
TypeOK == x <= Max
====
";

pub const CFG: &str = "\
CONSTANTS
    Max = 2
INIT Init
NEXT Next
INVARIANT TypeOK
";

/// A three-state counterexample in `-dumpTrace json` shape.
pub const THREE_STATE_DUMP: &str = r#"{"counterexample": {
  "state": [[1, {"x": 0, "y": 0}], [2, {"x": 1, "y": 0}], [3, {"x": 2, "y": 0}]],
  "action": [
    [[1, {"x": 0, "y": 0}], {"name": "Next"}, [2, {"x": 1, "y": 0}]],
    [[2, {"x": 1, "y": 0}], {"name": "Next"}, [3, {"x": 2, "y": 0}]]
  ]
}}"#;

/// Locates the trace path that follows `-dumpTrace json` in the argument list.
const FIND_TRACE: &str = r#"trace=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "json" ]; then trace="$arg"; fi
  prev="$arg"
done
"#;

pub struct Workspace {
    pub dir: TempDir,
    pub spec: PathBuf,
    pub out_root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let spec = dir.path().join("Counter.tla");
        std::fs::write(&spec, SPEC).expect("write spec");
        std::fs::write(dir.path().join("Counter.cfg"), CFG).expect("write cfg");
        let out_root = dir.path().join("runs");
        Self {
            dir,
            spec,
            out_root,
        }
    }

    /// Write an executable fake engine. `$trace` holds the dump path.
    #[cfg(unix)]
    pub fn engine(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}{}\n", FIND_TRACE, body))
            .expect("write engine");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod engine");
        path
    }

    pub fn config(&self, engine: &Path) -> RunConfig {
        RunConfig::new(
            &self.spec,
            None,
            EngineLocation::Executable(engine.to_path_buf()),
        )
        .with_out_root(Some(self.out_root.clone()))
    }
}

/// Shell snippet writing `dump` to the trace path.
pub fn write_dump(dump: &str) -> String {
    format!("cat > \"$trace\" <<'DUMP'\n{}\nDUMP\n", dump)
}
