// ABOUTME: Metadata service backed by the project's Python interpreter and importlib.metadata.
// ABOUTME: One subprocess per run; names go in on stdin as JSON, the mapping comes back on stdout.
use crossbeam_channel::RecvTimeoutError;
use pyprune_core::{PruneError, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{MetadataService, RawMetadataMap};

/// Runs inside the target interpreter. Reads a JSON list of manifest names
/// and prints `{name: {"import_names": [...], "requires": [...]}}`.
pub const METADATA_SCRIPT: &str = r#"
import json
import sys
from importlib import metadata

METADATA_SUFFIXES = (".dist-info", ".egg-info", ".data")
CACHE_SEGMENTS = {"__pycache__", "..", "."}


def guess(name):
    return [name.lower().replace("-", "_"), name]


def surface_from_files(dist):
    segments = []
    for path in dist.files or []:
        parts = path.parts
        if not parts:
            continue
        head = parts[0]
        if head in CACHE_SEGMENTS or head.endswith(METADATA_SUFFIXES):
            continue
        if head not in segments:
            segments.append(head)
    return segments


def describe(requested):
    name = requested.split("[", 1)[0].strip()
    try:
        dist = metadata.distribution(name)
    except metadata.PackageNotFoundError:
        return {"import_names": guess(name), "requires": []}

    top_level = dist.read_text("top_level.txt")
    if top_level:
        surface = [line.strip() for line in top_level.splitlines() if line.strip()]
    else:
        surface = surface_from_files(dist)
    return {"import_names": surface, "requires": list(dist.requires or [])}


def main():
    raw = sys.stdin.read()
    if not raw.strip():
        print("{}")
        return
    result = {}
    for requested in json.loads(raw):
        try:
            result[requested] = describe(requested)
        except Exception:
            name = requested.split("[", 1)[0].strip()
            result[requested] = {"import_names": guess(name), "requires": []}
    print(json.dumps(result))


main()
"#;

/// Queries distribution metadata through a Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonMetadataService {
    interpreter: PathBuf,
    timeout: Option<Duration>,
}

impl PythonMetadataService {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: None,
        }
    }

    /// Kill the interpreter and fail the query after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `0` seconds means no bound.
    pub fn with_timeout_secs(self, secs: u64) -> Self {
        if secs == 0 {
            self
        } else {
            self.with_timeout(Duration::from_secs(secs))
        }
    }

    fn run(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let start = Instant::now();
        debug!("Starting metadata query with {}", self.interpreter.display());

        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(METADATA_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PruneError::Metadata(format!(
                    "failed to start {}: {}",
                    self.interpreter.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PruneError::Metadata("missing stdin".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| PruneError::Metadata("missing stdout".to_string()))?;
        let stderr = child.stderr.take();

        let writer = thread::spawn(move || {
            // dropping stdin closes the pipe so the script sees EOF
            if let Err(e) = stdin.write_all(&payload) {
                debug!("metadata stdin closed early: {}", e);
            }
        });

        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf);
            }
            buf
        });

        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::spawn(move || {
            let mut buf = Vec::new();
            let res = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(res);
        });

        let received = match self.timeout {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let output = match received {
            Ok(output) => output?,
            Err(RecvTimeoutError::Timeout) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PruneError::Metadata(format!(
                    "metadata query timed out after {:.1?}",
                    start.elapsed()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PruneError::Metadata(
                    "metadata reader exited without output".to_string(),
                ));
            }
        };

        let _ = writer.join();
        let status = child.wait()?;
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(PruneError::Metadata(format!(
                "metadata query failed ({}): {}",
                status,
                stderr.trim()
            )));
        }

        info!("Metadata query finished in {:.1?}", start.elapsed());
        Ok(output)
    }
}

impl MetadataService for PythonMetadataService {
    fn query(&self, names: &[String]) -> Result<RawMetadataMap> {
        if names.is_empty() {
            return Ok(RawMetadataMap::new());
        }

        let payload = serde_json::to_vec(names)?;
        let output = self.run(payload)?;

        if output.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawMetadataMap::new());
        }
        Ok(serde_json::from_slice(&output)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::RawPackageInfo;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Fake interpreter: a shell script that ignores its arguments.
    fn fake_python(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("python");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_interpreter_response() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(
            dir.path(),
            r#"cat > /dev/null
echo '{"PyYAML": {"import_names": ["yaml", "_yaml"], "requires": []}}'"#,
        );

        let map = PythonMetadataService::new(python)
            .query(&names(&["PyYAML"]))
            .unwrap();
        assert_eq!(
            map.get("PyYAML"),
            Some(&RawPackageInfo::new(["yaml", "_yaml"], Vec::<String>::new()))
        );
    }

    #[test]
    fn request_is_a_json_list_of_names() {
        let dir = tempfile::tempdir().unwrap();
        let captured = dir.path().join("stdin.json");
        let python = fake_python(
            dir.path(),
            &format!("cat > {}\necho '{{}}'", captured.display()),
        );

        PythonMetadataService::new(python)
            .query(&names(&["pydantic[email]", "six"]))
            .unwrap();
        let sent = std::fs::read_to_string(captured).unwrap();
        assert_eq!(sent, r#"["pydantic[email]","six"]"#);
    }

    #[test]
    fn empty_output_means_no_information() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "cat > /dev/null");
        let map = PythonMetadataService::new(python)
            .query(&names(&["six"]))
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn malformed_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "cat > /dev/null\necho 'Traceback: nope'");
        assert!(PythonMetadataService::new(python)
            .query(&names(&["six"]))
            .is_err());
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "cat > /dev/null\necho boom >&2\nexit 3");
        let err = PythonMetadataService::new(python)
            .query(&names(&["six"]))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn missing_interpreter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PythonMetadataService::new(dir.path().join("no-such-python"))
            .query(&names(&["six"]))
            .unwrap_err();
        assert!(matches!(err, PruneError::Metadata(_)));
    }

    #[test]
    fn hung_interpreter_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let python = fake_python(dir.path(), "exec sleep 30");
        let start = Instant::now();
        let err = PythonMetadataService::new(python)
            .with_timeout(Duration::from_millis(200))
            .query(&names(&["six"]))
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn empty_batch_skips_the_interpreter() {
        let map = PythonMetadataService::new("/definitely/not/python")
            .query(&[])
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn real_interpreter_guesses_unknown_distributions() {
        let python = PathBuf::from("python3");
        let available = Command::new(&python)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false);
        if !available {
            return;
        }

        let map = PythonMetadataService::new(python)
            .with_timeout_secs(60)
            .query(&names(&["No-Such-Dist-Pyprune[extra]"]))
            .unwrap();
        let info = &map["No-Such-Dist-Pyprune[extra]"];
        assert_eq!(
            info.import_names,
            vec!["no_such_dist_pyprune".to_string(), "No-Such-Dist-Pyprune".to_string()]
        );
        assert!(info.requires.is_empty());
    }
}
