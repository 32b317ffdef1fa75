//! Shared fixtures for lane integration tests.
//!
//! A fake `arduino-cli` shell script stands in for the real toolchain.
//! Every invocation appends its argv to `calls.log` in the fixture
//! directory, so tests can assert exactly what the lane ran.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use sketchlane::LaneConfig;
use tempfile::TempDir;

/// Compiles by writing `<sketch>.ino.hex` and `.eep` into `--output-dir`;
/// uploads succeed; listings echo a fixed document.
pub const TOOLCHAIN_OK: &str = r#"
case "$1" in
  compile)
    for arg in "$@"; do sketch="$arg"; done
    while [ $# -gt 0 ]; do
      if [ "$1" = "--output-dir" ]; then out="$2"; fi
      shift
    done
    name=$(basename "$sketch")
    (cd "$sketch" && find . -type f | sort) >> "$FIXTURE_DIR/staged.log"
    printf ':00000001FF\n' > "$out/$name.ino.hex"
    printf ':00000001FF\n' > "$out/$name.ino.eep"
    echo '{"compiler_out":"Sketch uses 444 bytes","success":true}'
    ;;
  upload)
    echo '{"success":true}'
    ;;
  board)
    echo '{"detected_ports":[]}'
    ;;
  version)
    echo '{"Application":"arduino-cli","VersionString":"1.1.1"}'
    ;;
esac
"#;

/// Compile reports a GCC error; anything else succeeds.
pub const COMPILE_FAILS: &str = r#"
if [ "$1" = "compile" ]; then
  echo "Blink.ino:3:5: error: expected ';' before '}' token" >&2
  echo "Blink.ino:1:1: warning: unused variable 'x'" >&2
  exit 1
fi
echo '{}'
"#;

/// Compile succeeds; upload cannot open the port.
pub const UPLOAD_FAILS: &str = r#"
case "$1" in
  compile) echo '{"success":true}' ;;
  upload) echo "Failed uploading: no device found on /dev/ttyACM0" >&2; exit 2 ;;
esac
"#;

/// Leaves a grandchild behind, then hangs past any test deadline.
pub const HANGS: &str = r#"
sleep 300 &
echo $! > "$FIXTURE_DIR/grandchild.pid"
sleep 300
"#;

/// Fake toolchain living in its own temp directory.
pub struct FakeToolchain {
    dir: TempDir,
    path: PathBuf,
}

impl FakeToolchain {
    /// Install a script running `body` after logging its argv.
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().expect("fixture dir");
        let path = dir.path().join("arduino-cli");
        let script = format!(
            "#!/bin/sh\nFIXTURE_DIR='{dir}'\necho \"$@\" >> \"$FIXTURE_DIR/calls.log\"\n{body}\n",
            dir = dir.path().display(),
            body = body,
        );
        fs::write(&path, script).expect("write fake toolchain");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake toolchain");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Argument lines of every invocation so far.
    pub fn calls(&self) -> Vec<String> {
        read_lines(&self.dir.path().join("calls.log"))
    }

    /// Files the compiles saw in the sketch directory.
    pub fn staged(&self) -> Vec<String> {
        read_lines(&self.dir.path().join("staged.log"))
    }

    /// Lane config pointing at this toolchain and a private temp root.
    pub fn config(&self, temp_root: &Path) -> LaneConfig {
        LaneConfig {
            toolchain_path: self.path.clone(),
            temp_root: Some(temp_root.to_path_buf()),
            compile_timeout_seconds: 20,
            termination_grace_seconds: 1,
            ..Default::default()
        }
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Entries left under a temp root.
pub fn leftovers(temp_root: &Path) -> Vec<PathBuf> {
    fs::read_dir(temp_root)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

/// A small sketch directory named `name` under `parent`.
pub fn sketch_dir(parent: &Path, name: &str) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(dir.join("src")).expect("sketch dir");
    fs::write(
        dir.join(format!("{}.ino", name)),
        "#include \"src/led.h\"\nvoid setup(){}\nvoid loop(){}\n",
    )
    .expect("write sketch");
    fs::write(dir.join("src/led.h"), "#define LED 13\n").expect("write header");
    fs::write(dir.join("README.md"), "# notes\n").expect("write readme");
    dir
}
