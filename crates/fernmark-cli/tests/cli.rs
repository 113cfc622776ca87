use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    if let Some(path) = env::var_os("CARGO_BIN_EXE_fernmark-cli") {
        return PathBuf::from(path);
    }
    if let Some(path) = env::var_os("CARGO_BIN_EXE_fernmark_cli") {
        return PathBuf::from(path);
    }
    let exe = env::current_exe().expect("current exe");
    let mut debug_dir = exe.as_path();
    while let Some(parent) = debug_dir.parent() {
        if parent.file_name().and_then(|name| name.to_str()) == Some("debug") {
            let candidate = parent.join("fernmark-cli");
            if candidate.exists() {
                return candidate;
            }
        }
        debug_dir = parent;
    }
    panic!("binary path missing");
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("time");
    let file_name = format!(
        "fernmark_cli_{}_{}_{}.md",
        name,
        now.as_secs(),
        now.subsec_nanos()
    );
    path.push(file_name);
    fs::write(&path, contents).expect("write temp file");
    path
}

#[test]
fn renders_file_argument_to_html() {
    let input = temp_file("basic", "# Title\n\nSome *emphasis*.\n");
    let output = Command::new(bin_path())
        .args([input.to_str().expect("path")])
        .output()
        .expect("run");

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<h1>Title</h1>"));
    assert!(stdout.contains("<p>Some <em>emphasis</em>.</p>"));
}

#[test]
fn sanitized_mode_strips_raw_html() {
    let input = temp_file("sanitized", "before\n\n<script>alert(1)</script>\n");
    let output = Command::new(bin_path())
        .args(["--sanitized", input.to_str().expect("path")])
        .output()
        .expect("run");

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<p>before</p>"));
    assert!(!stdout.contains("<script>"), "expected script stripped");
}

#[test]
fn missing_input_file_exits_nonzero() {
    let output = Command::new(bin_path())
        .args(["/no/such/file.md"])
        .output()
        .expect("run");

    assert!(!output.status.success(), "expected error exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"));
}

#[test]
fn reads_stdin_when_no_argument() {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(bin_path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(b"- a\n- b\n")
        .expect("write");
    let output = child.wait_with_output().expect("wait");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<ul>"));
    assert!(stdout.contains("<li>a</li>"));
}
