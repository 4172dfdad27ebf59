// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level behavior of the converged binary

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command as StdCommand, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn converged() -> Command {
    let mut cmd = Command::cargo_bin("converged").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("CONVERGE_QUEUE_ENDPOINT")
        .env_remove("CONVERGE_ROLE_ENDPOINT")
        .env_remove("CONVERGE_BUCKET_ENDPOINT");
    cmd
}

fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn read_head(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !String::from_utf8_lossy(&buf).contains("\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// API server that answers lists with an empty collection and holds every
/// watch open without ever sending an event. Reports each opened watch.
fn silent_watch_server() -> (String, mpsc::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (opened, watch_opened) = mpsc::channel();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let request = read_head(&mut stream);
            if request.contains("watch=true") {
                let _ = stream.write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ntransfer-encoding: chunked\r\n\r\n",
                );
                let _ = opened.send(());
                held.push(stream);
            } else {
                let body = r#"{"metadata":{"resourceVersion":"1"},"items":[]}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        }
    });
    (format!("http://{}", addr), watch_opened)
}

#[test]
fn help_lists_flags() {
    converged()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--kind"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn unknown_kind_is_rejected() {
    converged()
        .args(["--kind", "topic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'topic'"));
}

#[test]
fn missing_config_file_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    let output = converged().arg("--config").arg(&path).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("config file not found").count(), 1, "{}", stderr);
}

#[test]
fn malformed_config_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "api_url = [").unwrap();

    converged()
        .arg("--config")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid config file"));
}

#[test]
fn unreachable_watch_source_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, format!("api_url = \"{}\"\n", closed_url())).unwrap();

    converged()
        .arg("--config")
        .arg(&path)
        .args(["--kind", "queue", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("initial list of queue failed"));
}

#[test]
fn logs_go_to_configured_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let log_path = dir.path().join("logs").join("converged.log");
    std::fs::write(
        &path,
        format!(
            "api_url = \"{}\"\nlog_path = \"{}\"\n",
            closed_url(),
            log_path.display()
        ),
    )
    .unwrap();

    converged()
        .arg("--config")
        .arg(&path)
        .args(["--kind", "role", "--dry-run"])
        .assert()
        .code(1);

    let logs = std::fs::read_to_string(&log_path).unwrap();
    assert!(logs.contains("starting converged"), "{}", logs);
    assert!(logs.contains("initial list of role failed"), "{}", logs);
}

#[test]
fn sigterm_exits_promptly_while_a_watch_is_idle() {
    let (api_url, watch_opened) = silent_watch_server();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, format!("api_url = \"{}\"\n", api_url)).unwrap();

    let mut child = StdCommand::cargo_bin("converged")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .args(["--kind", "queue", "--dry-run"])
        .env_remove("RUST_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    watch_opened.recv_timeout(Duration::from_secs(10)).unwrap();
    let killed = StdCommand::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break Some(exit);
        }
        if Instant::now() >= deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    let Some(exit) = exit else {
        let _ = child.kill();
        panic!("converged still running 5s after SIGTERM");
    };
    assert!(exit.success(), "{:?}", exit);
}
