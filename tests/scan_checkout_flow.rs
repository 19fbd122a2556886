//! End-to-end scan flow over the sidecar protocol. Uses check-out codes
//! throughout: they are accepted at any time of day, so the assertions do
//! not depend on when the suite runs.

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendanced");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn checkout_scan_upserts_one_ledger_row_and_appends_history() {
    let workspace = temp_dir("attendanced-checkout-flow");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.upsert",
        json!({
            "email": "maria@example.com",
            "name": "Maria Clara",
            "gradeSection": "9-C",
            "lrn": "109876543210",
            "adviser": "Mrs. Ibarra",
            "schedule": {},
            "qrCodeIn": "FLOW_IN_maria",
            "qrCodeOut": "FLOW_OUT_maria"
        }),
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "scan.process",
        json!({ "qrCode": "FLOW_OUT_maria" }),
    );
    assert_eq!(first.get("success").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(first.get("status").and_then(|v| v.as_str()), Some("scanned"));
    assert_eq!(
        first.get("message").and_then(|v| v.as_str()),
        Some("Your QRcode is Scanned")
    );
    assert_eq!(
        first.get("userEmail").and_then(|v| v.as_str()),
        Some("maria@example.com")
    );
    assert_eq!(
        first.get("userName").and_then(|v| v.as_str()),
        Some("Maria Clara")
    );
    assert_eq!(first.get("qrType").and_then(|v| v.as_str()), Some("OUT"));

    // Second scan of the same code, same day: overwrite, not duplicate.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "scan.process",
        json!({ "qrCode": "FLOW_OUT_maria" }),
    );

    let attendance = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.forUser",
        json!({ "email": "maria@example.com" }),
    );
    let rows = attendance
        .get("attendance")
        .and_then(|v| v.as_array())
        .expect("attendance rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("qrType").and_then(|v| v.as_str()),
        Some("OUT")
    );
    assert_eq!(
        rows[0].get("status").and_then(|v| v.as_str()),
        Some("scanned")
    );

    let history = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "history.forUser",
        json!({ "email": "maria@example.com" }),
    );
    let entries = history
        .get("history")
        .and_then(|v| v.as_array())
        .expect("history entries");
    assert_eq!(entries.len(), 2);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_code_is_rejected_without_an_audit_trail() {
    let workspace = temp_dir("attendanced-unknown-code");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "scan.process",
        json!({ "qrCode": "bogus" }),
    );
    assert_eq!(result.get("success").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("invalid"));
    assert_eq!(
        result.get("message").and_then(|v| v.as_str()),
        Some("Invalid QRcode")
    );
    assert_eq!(
        result.get("error").and_then(|v| v.as_str()),
        Some("User not found")
    );
    assert!(result.get("userEmail").is_none());

    let history = request_ok(&mut stdin, &mut reader, "3", "history.listAll", json!({}));
    let entries = history
        .get("history")
        .and_then(|v| v.as_array())
        .expect("history entries");
    assert!(entries.is_empty());
    let attendance = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.listAll",
        json!({}),
    );
    let rows = attendance
        .get("attendance")
        .and_then(|v| v.as_array())
        .expect("attendance rows");
    assert!(rows.is_empty());

    let _ = std::fs::remove_dir_all(workspace);
}
