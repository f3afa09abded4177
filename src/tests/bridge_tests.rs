#![cfg(test)]

use std::io::{BufReader, Cursor, Read};

use serde_json::json;

use crate::bridge::*;

/// Hands out one byte per read call
struct Trickle<'a> {
    bytes: &'a [u8],
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.bytes.is_empty() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.bytes[0];
        self.bytes = &self.bytes[1..];
        Ok(1)
    }
}

#[test]
fn framing_ignores_chunk_boundaries() {
    let value = json!({
        "success": true,
        "data": {"methods": [{"name": "foo", "lines": 3}, {"name": "bar", "lines": 9}]},
        "error": ""
    });
    for text in [serde_json::to_string(&value).unwrap(), serde_json::to_string_pretty(&value).unwrap()] {
        let stream = format!("{text}\n");
        let whole = read_frame(&mut Cursor::new(stream.as_bytes())).unwrap();
        let mut trickle = BufReader::with_capacity(1, Trickle { bytes: stream.as_bytes() });
        let pieces = read_frame(&mut trickle).unwrap();
        assert_eq!(whole, pieces);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&pieces).unwrap(), value);
    }
}

#[test]
fn error_kinds() {
    assert_eq!(BridgeError::NoResponse.kind(), ErrorKind::Framing);
    assert_eq!(BridgeError::IncompleteFrame { partial: "{".to_string() }.kind(), ErrorKind::Framing);
    assert_eq!(BridgeError::Closed.kind(), ErrorKind::Closed);
    let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
    assert_eq!(BridgeError::from(io).kind(), ErrorKind::Transport);
    let decode = serde_json::from_str::<Response>("{not json}").unwrap_err();
    assert_eq!(BridgeError::Decode { text: "{not json}".to_string(), source: decode }.kind(), ErrorKind::Decode);
}

#[cfg(unix)]
mod worker_process {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::Command as OsCommand;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use crate::bridge::*;
    use crate::editor::DexEditor;

    /// Answers every request with the request itself as `data`, spread over several lines
    const ECHO_WORKER: &str = r#"while IFS= read -r line; do
  case "$line" in
    *'"command":"get_class"'*) printf '{"success": false, "error": "Class not found"}\n' ;;
    *'"command":"garbage"'*) printf '{not json}\n' ;;
    *'"command":"silent"'*) exit 0 ;;
    *) printf 'worker log line\n{\n  "success": true,\n  "data": %s\n}\n' "$line" ;;
  esac
done"#;

    /// Appends every request line to the file named by `$1`. `set_jadx` is answered with
    /// `success` set to `$2`, everything else succeeds.
    const RECORDING_WORKER: &str = r#"while IFS= read -r line; do
  printf '%s\n' "$line" >> "$1"
  case "$line" in
    *'"command":"set_jadx"'*) printf '{"success": %s, "error": "jadx rejected"}\n' "$2" ;;
    *) printf '{"success": true, "data": "ok"}\n' ;;
  esac
done"#;

    /// Answers one request with its own pid, then exits
    const ONE_SHOT_WORKER: &str = r#"read -r line; printf '{"success": true, "data": %s}\n' "$$""#;

    fn sh(script: &str) -> BridgeConfig {
        BridgeConfig::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    fn echoed(r: &Response) -> serde_json::Value {
        r.data.clone().expect("echo worker returns data")
    }

    fn wait_until_exited(bridge: &mut ProcessBridge) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while bridge.is_running() {
            assert!(Instant::now() < deadline, "worker did not exit");
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn exchange_round_trip() {
        let mut bridge = ProcessBridge::new(sh(ECHO_WORKER));
        assert!(!bridge.is_running());
        let r = bridge.send(&DexRequest::GetMethod { class_name: "LA;", method_name: "foo" }.to_command()).unwrap();
        assert!(r.success);
        assert_eq!(echoed(&r), json!({"command": "get_method", "args": ["LA;", "foo"]}));
        assert!(bridge.is_running());

        // same worker serves the next request
        let pid = bridge.worker_id();
        let r = bridge.send(&DexRequest::Save { output_path: None }.to_command()).unwrap();
        assert_eq!(echoed(&r), json!({"command": "save", "args": []}));
        assert_eq!(bridge.worker_id(), pid);
    }

    #[test]
    fn worker_failure_is_a_response() {
        let mut bridge = ProcessBridge::new(sh(ECHO_WORKER));
        let r = bridge.send(&DexRequest::GetClass { class_name: "LMissing;" }.to_command()).unwrap();
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("Class not found"));
    }

    #[test]
    fn undecodable_frame_keeps_worker() {
        let mut bridge = ProcessBridge::new(sh(ECHO_WORKER));
        let err = bridge.send(&Command::new("garbage", vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().starts_with("JSON parse error"));
        let r = bridge.send(&Command::new("ping", vec![])).unwrap();
        assert!(r.success);
    }

    #[test]
    fn silent_exit_is_no_response_then_respawn() {
        let mut bridge = ProcessBridge::new(sh(ECHO_WORKER));
        let err = bridge.send(&Command::new("silent", vec![])).unwrap_err();
        assert!(matches!(err, BridgeError::NoResponse));
        assert_eq!(err.to_string(), "no response from worker");
        assert!(!bridge.is_running());
        let r = bridge.send(&Command::new("ping", vec![])).unwrap();
        assert!(r.success);
    }

    #[test]
    fn missing_program_is_transport_error() {
        let mut bridge = ProcessBridge::new(BridgeConfig::new("/nonexistent/dex-editor", vec![]));
        let err = bridge.send(&Command::new("ping", vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err, BridgeError::Spawn { .. }));
    }

    #[test]
    fn exited_worker_is_replaced() {
        let mut bridge = ProcessBridge::new(sh(ONE_SHOT_WORKER));
        let first = bridge.send(&Command::new("ping", vec![])).unwrap().data;
        wait_until_exited(&mut bridge);
        assert_eq!(bridge.worker_id(), None);
        let second = bridge.send(&Command::new("ping", vec![])).unwrap().data;
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn killed_worker_does_not_hang_next_send() {
        let mut bridge = ProcessBridge::new(sh(ECHO_WORKER));
        bridge.send(&Command::new("ping", vec![])).unwrap();
        let pid = bridge.worker_id().expect("worker running");
        let status = OsCommand::new("kill").arg("-9").arg(pid.to_string()).status().unwrap();
        assert!(status.success());

        // either the dead worker is noticed up front, or the exchange fails on its pipes
        let mut recovered = false;
        for _ in 0..3 {
            match bridge.send(&Command::new("ping", vec![])) {
                Ok(r) => {
                    assert!(r.success);
                    recovered = true;
                    break;
                }
                Err(e) => assert!(matches!(e.kind(), ErrorKind::Transport | ErrorKind::Framing)),
            }
        }
        assert!(recovered);
        assert_ne!(bridge.worker_id(), Some(pid));
    }

    #[test]
    fn close_clears_handle_and_next_send_respawns() {
        let mut bridge = ProcessBridge::new(sh(ECHO_WORKER));
        bridge.send(&Command::new("ping", vec![])).unwrap();
        bridge.close();
        assert!(!bridge.is_running());
        bridge.close();
        let r = bridge.send(&Command::new("ping", vec![])).unwrap();
        assert!(r.success);
    }

    fn recording(name: &str, set_jadx_succeeds: bool) -> (BridgeConfig, PathBuf) {
        let journal = std::env::temp_dir().join(format!("smali-bridge-{}-{}.log", std::process::id(), name));
        let _ = fs::remove_file(&journal);
        let args = vec![
            "-c".to_string(),
            RECORDING_WORKER.to_string(),
            "recording-worker".to_string(),
            journal.to_string_lossy().into_owned(),
            set_jadx_succeeds.to_string(),
        ];
        (BridgeConfig::new("/bin/sh", args), journal)
    }

    fn received(journal: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(journal)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn session_hands_jadx_path_to_worker_on_open() {
        let (config, journal) = recording("jadx-ok", true);
        let editor = DexEditor::new(config.with_jadx_path("/opt/jadx/bin/jadx"));
        let r = editor.open("/tmp/app.apk").unwrap();
        assert!(r.success);
        assert_eq!(
            received(&journal),
            vec![
                json!({"command": "set_jadx", "args": ["/opt/jadx/bin/jadx"]}),
                json!({"command": "open", "args": ["/tmp/app.apk"]}),
            ]
        );
        editor.close();
        fs::remove_file(&journal).unwrap();
    }

    #[test]
    fn rejected_jadx_path_does_not_block_open() {
        let (config, journal) = recording("jadx-rejected", false);
        let editor = DexEditor::new(config.with_jadx_path("/missing/jadx"));
        let r = editor.open("/tmp/app.apk").unwrap();
        assert!(r.success);
        assert_eq!(r.data, Some(json!("ok")));
        let commands: Vec<_> = received(&journal).into_iter().map(|v| v["command"].clone()).collect();
        assert_eq!(commands, vec![json!("set_jadx"), json!("open")]);
        editor.close();
        fs::remove_file(&journal).unwrap();
    }

    #[test]
    fn no_jadx_path_opens_directly() {
        let (config, journal) = recording("no-jadx", true);
        let editor = DexEditor::new(config);
        assert!(editor.open("/tmp/app.apk").unwrap().success);
        assert_eq!(received(&journal), vec![json!({"command": "open", "args": ["/tmp/app.apk"]})]);
        editor.close();
        fs::remove_file(&journal).unwrap();
    }

    #[test]
    fn session_shapes_commands() {
        let editor = DexEditor::new(sh(ECHO_WORKER));
        let r = editor.get_paged("LA;", None, Some(50)).unwrap();
        assert_eq!(echoed(&r), json!({"command": "get_paged", "args": ["LA;", "0", "50"]}));
        let r = editor.list_classes(None).unwrap();
        assert_eq!(echoed(&r), json!({"command": "list_classes", "args": []}));
        let r = editor.modify_class("LA;", ".class LA;\n.super Ljava/lang/Object;\n").unwrap();
        assert_eq!(
            echoed(&r),
            json!({"command": "modify_class", "args": ["LA;", ".class LA;\n.super Ljava/lang/Object;\n"]})
        );
        let r = editor.deobfuscate("La/b;").unwrap();
        assert_eq!(echoed(&r), json!({"command": "deobf", "args": ["La/b;"]}));
    }

    #[test]
    fn closed_session_rejects_calls() {
        let editor = DexEditor::new(sh(ECHO_WORKER));
        assert!(editor.search_class("Main").unwrap().success);
        editor.close();
        assert!(editor.is_closed());
        assert!(matches!(editor.search_class("Main"), Err(BridgeError::Closed)));
        assert!(matches!(editor.open("/tmp/app.apk"), Err(BridgeError::Closed)));
        editor.close();
    }

    #[test]
    fn concurrent_callers_never_interleave() {
        let editor = Arc::new(DexEditor::new(sh(ECHO_WORKER)));
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let editor = Arc::clone(&editor);
                thread::spawn(move || {
                    for i in 0..10 {
                        let text = format!("t{t}-{i}");
                        let r = editor.search_string(&text).unwrap();
                        assert_eq!(r.data, Some(json!({"command": "search_string", "args": [text]})));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        editor.close();
    }
}
