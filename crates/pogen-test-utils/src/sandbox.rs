//! sandbox.rs
//!
//! Hermetic test sandbox for running the `pogen` binary.
//! - Input CSVs and outputs live under an `assert_fs::TempDir`, cleaned up on drop
//! - Commands get a minimal environment: no inherited `POGEN_CATALOG_URL`,
//!   `RUST_LOG` or color settings unless set on the sandbox
//!
//! ## Quick example
//! ```no_run
//! use pogen_test_utils::sandbox::Sandbox;
//!
//! let mut sb = Sandbox::new();
//! sb.write("bom.csv", "Part Number,Quantity\nP1,2\n");
//!
//! let output = sb.output("pogen", ["--help"]);
//! assert!(output.status.success());
//! ```

use assert_fs::TempDir;
use duct::Expression;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

pub struct Sandbox {
    root: TempDir,
    env: HashMap<String, String>,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// Create a new sandbox; all state is under an auto-cleaned TempDir.
    pub fn new() -> Self {
        let root = TempDir::new().expect("create sandbox TempDir");
        let mut env = HashMap::new();
        env.insert("NO_COLOR".to_string(), "1".to_string());
        Self { root, env }
    }

    /// Absolute path to the sandbox root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Absolute path of a file relative to the sandbox root.
    pub fn path<P: AsRef<Path>>(&self, rel: P) -> PathBuf {
        self.root_path().join(rel)
    }

    /// Write/overwrite a file relative to the sandbox root.
    pub fn write<P: AsRef<Path>, S: AsRef<[u8]>>(&mut self, rel: P, contents: S) -> &mut Self {
        let p = self.path(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(p, contents).expect("write file");
        self
    }

    /// Read a file relative to the sandbox root.
    pub fn read<P: AsRef<Path>>(&self, rel: P) -> String {
        fs::read_to_string(self.path(rel)).expect("read file")
    }

    /// Set an environment variable for commands run in this sandbox.
    pub fn with_env<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn cargo_cmd<I>(&self, program: &str, args: I) -> Expression
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        let cargo_bin_path = assert_cmd::cargo::cargo_bin(program);
        let args: Vec<_> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();

        self.inject_env(duct::cmd(cargo_bin_path, args).dir(self.root_path()))
    }

    /// Run a cargo binary inside this sandbox and return stdout as String.
    /// Errors if the process exits with non-zero status.
    pub fn run<I>(&self, program: &str, args: I) -> Result<String, String>
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        self.cargo_cmd(program, args)
            .read()
            .map_err(|e| format!("command failed: {e}"))
    }

    /// Run a cargo binary and capture stdout, stderr and the exit status,
    /// whether or not it succeeds.
    pub fn output<I>(&self, program: &str, args: I) -> Output
    where
        I: IntoIterator,
        I::Item: AsRef<OsStr>,
    {
        self.cargo_cmd(program, args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .expect("spawn command")
    }

    fn inject_env(&self, expr: Expression) -> Expression {
        let mut env_map = self.env.clone();
        if let Ok(path) = std::env::var("PATH") {
            env_map.entry("PATH".into()).or_insert(path);
        }
        env_map
            .entry("HOME".into())
            .or_insert_with(|| self.root_path().to_string_lossy().into_owned());

        expr.full_env(&env_map)
    }
}
