use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use pcp_lang::{CompiledUnit, Language, Launch};
use scopeguard::ScopeGuard;
use tempfile::TempDir;

use crate::reaper;
use crate::{ExecError, ExecutionContext, LoadError};

/// Environment variables passed from the host to the submissions. `PATH` is not among them: the
/// runtime is started by absolute path and the submission has no business looking up tools.
const PASSTHROUGH_ENV: &[&str] = &["LANG", "LC_ALL", "JAVA_HOME"];

/// Materializes compiled units into fresh private namespaces.
#[derive(Debug, Clone, Default)]
pub struct IsolatedLoader {
    /// Where to create the namespaces, the system temporary directory if `None`.
    root: Option<PathBuf>,
}

/// A compiled unit loaded in its own namespace, ready to be invoked. The namespace is removed when
/// the `Runnable` is dropped.
#[derive(Debug)]
pub struct Runnable {
    namespace: TempDir,
    language: Language,
    entry_point: String,
    launch: Launch,
}

impl IsolatedLoader {
    /// Make a loader that creates the namespaces inside `root`, or inside the system temporary
    /// directory.
    pub fn new(root: Option<PathBuf>) -> IsolatedLoader {
        IsolatedLoader { root }
    }

    /// Load the unit in a new namespace, independent from every other namespace: two submissions
    /// with the same entry point never see each other's artifacts.
    pub fn load(&self, unit: &CompiledUnit) -> Result<Runnable, LoadError> {
        unit.resolve_entry_point()?;
        let namespace = match &self.root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                TempDir::with_prefix_in("pcp-ns-", root)?
            }
            None => TempDir::with_prefix("pcp-ns-")?,
        };
        for (path, content) in unit.artifacts() {
            write_namespace_file(&namespace.path().join(path), content)?;
        }
        debug!(
            "Loaded {} ({}) in {}",
            unit.entry_point(),
            unit.language(),
            namespace.path().display()
        );
        Ok(Runnable {
            namespace,
            language: unit.language(),
            entry_point: unit.entry_point().to_string(),
            launch: unit.launch().clone(),
        })
    }
}

impl Runnable {
    /// The name of the entry point.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// The language of the loaded unit.
    pub fn language(&self) -> Language {
        self.language
    }

    /// The directory of the namespace.
    pub fn namespace(&self) -> &Path {
        self.namespace.path()
    }

    /// Start the entry point with `args`, connecting its streams to `ctx`. The child is the leader
    /// of a new process group, so that it can be killed together with everything it spawns. The
    /// child is a reaper: the runtime runs in its own child, so its parent is never the host.
    pub fn invoke(&self, args: &[String], ctx: &mut ExecutionContext) -> Result<Child, ExecError> {
        let mut command = Command::new(&self.launch.program);
        command
            .args(&self.launch.args)
            .args(args)
            .current_dir(self.namespace.path())
            .env_clear()
            .env("HOME", self.namespace.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        // SAFETY: `interpose` only forks, closes descriptors, waits and exits.
        unsafe {
            command.pre_exec(|| reaper::interpose());
        }
        for var in PASSTHROUGH_ENV {
            if let Some(value) = std::env::var_os(var) {
                command.env(var, value);
            }
        }
        trace!("Invoking {:?}", command);
        let child = command.spawn().map_err(|source| ExecError::Spawn {
            program: self.launch.program.clone(),
            source,
        })?;
        // a child that cannot be connected to the context must not keep running
        let mut child = scopeguard::guard(child, |mut child| {
            let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
            let _ = child.wait();
        });
        ctx.activate(&mut *child)?;
        Ok(ScopeGuard::into_inner(child))
    }
}

/// Put a file inside the namespace, creating the directories if needed. The file is read-only
/// (`r--------`, 0o400).
fn write_namespace_file(dest: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, content)?;
    let mut permissions = std::fs::metadata(dest)?.permissions();
    permissions.set_mode(0o400);
    std::fs::set_permissions(dest, permissions)?;
    Ok(())
}
