//! Tests for the OS integration layer

use super::*;
use nix::sys::signal::{SigSet, Signal};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::core::types::Tid;

fn write_task(task_dir: &Path, tid: &str, name: &str) {
    let dir = task_dir.join(tid);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("status"),
        format!("Name:\t{}\nUmask:\t0077\nState:\tS (sleeping)\nTgid:\t4242\n", name),
    )
    .unwrap();
}

fn current_tid() -> Tid {
    unsafe { libc::syscall(libc::SYS_gettid) as Tid }
}

#[test]
fn test_parse_status_name() {
    assert_eq!(
        parse_status_name("Name:\tSignal Catcher\nState:\tS (sleeping)\n"),
        Some("Signal Catcher")
    );
    assert_eq!(parse_status_name("Umask:\t0022\nName:\tmain\n"), Some("main"));
    assert_eq!(parse_status_name("Name:\tSignal\r\n"), Some("Signal"));
    assert_eq!(parse_status_name("State:\tR (running)\n"), None);
    assert_eq!(parse_status_name(""), None);
}

#[test]
fn test_parse_status_name_keeps_surrounding_spaces() {
    assert_eq!(parse_status_name("Name:\tSignal \n"), Some("Signal "));
    assert_eq!(parse_status_name("Name:\t Signal\n"), Some(" Signal"));
    assert_eq!(parse_status_name("Name:\t\n"), Some(""));
}

#[test]
fn test_padded_name_is_not_the_dump_thread() {
    use crate::watchdog::DumpThreadDiscovery;
    use std::sync::Arc;

    let temp = TempDir::new().unwrap();
    write_task(temp.path(), "12", "main");
    write_task(temp.path(), "77", "Signal ");
    write_task(temp.path(), "78", " Signal Catcher");

    let lister = ProcThreadLister::new(temp.path());
    assert_eq!(lister.thread_name(77).unwrap(), "Signal ");

    let discovery = DumpThreadDiscovery::new(
        Arc::new(lister),
        vec!["Signal Catcher".to_string(), "Signal".to_string()],
    );
    assert_eq!(discovery.find_dump_thread_id(), None);

    write_task(temp.path(), "79", "Signal");
    assert_eq!(discovery.find_dump_thread_id(), Some(79));
}

#[test]
fn test_fixture_lister_lists_numeric_entries() {
    let temp = TempDir::new().unwrap();
    write_task(temp.path(), "300", "RenderThread");
    write_task(temp.path(), "12", "main");
    write_task(temp.path(), "57", "Signal Catcher");
    fs::create_dir_all(temp.path().join("not-a-thread")).unwrap();
    fs::write(temp.path().join("README"), "noise").unwrap();

    let lister = ProcThreadLister::new(temp.path());
    assert_eq!(lister.thread_ids().unwrap(), vec![12, 57, 300]);
    assert_eq!(lister.thread_name(57).unwrap(), "Signal Catcher");
    assert_eq!(lister.thread_name(300).unwrap(), "RenderThread");
}

#[test]
fn test_fixture_lister_reports_vanished_and_garbled_threads() {
    let temp = TempDir::new().unwrap();
    write_task(temp.path(), "10", "main");
    let lister = ProcThreadLister::new(temp.path());

    // Thread listed, then exits before its status is read
    let err = lister.thread_name(11).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);

    fs::create_dir_all(temp.path().join("12")).unwrap();
    fs::write(temp.path().join("12").join("status"), "State:\tZ (zombie)\n").unwrap();
    let err = lister.thread_name(12).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn test_missing_task_dir_is_an_error() {
    let temp = TempDir::new().unwrap();
    let lister = ProcThreadLister::new(temp.path().join("gone"));
    assert!(lister.thread_ids().is_err());
}

#[test]
fn test_current_process_lister_sees_named_thread() {
    let lister = ProcThreadLister::current_process();
    let (tx, rx) = std::sync::mpsc::channel();
    let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();

    let handle = std::thread::Builder::new()
        .name("procfs-probe".to_string())
        .spawn(move || {
            tx.send(current_tid()).unwrap();
            let _ = done_rx.recv();
        })
        .unwrap();

    let tid = rx.recv().unwrap();
    assert!(lister.thread_ids().unwrap().contains(&tid));
    assert_eq!(lister.thread_name(tid).unwrap(), "procfs-probe");

    done_tx.send(()).unwrap();
    handle.join().unwrap();
}

#[test]
fn test_tgkill_reaches_only_the_target_thread() {
    let handle = std::thread::spawn(|| {
        let previous = block_in_current_thread(Signal::SIGUSR1).unwrap();

        TgkillSignaler::new()
            .signal_thread(current_tid(), Signal::SIGUSR1)
            .unwrap();

        let mut set = SigSet::empty();
        set.add(Signal::SIGUSR1);
        let received = set.wait().unwrap();

        restore_thread_mask(&previous).unwrap();
        received
    });

    assert_eq!(handle.join().unwrap(), Signal::SIGUSR1);
}

#[test]
fn test_tgkill_unknown_thread_fails() {
    // pid_max never reaches i32::MAX
    let err = TgkillSignaler::new()
        .signal_thread(Tid::MAX, Signal::SIGUSR1)
        .unwrap_err();
    assert_eq!(err.raw_os_error(), Some(libc::ESRCH));
}

#[test]
fn test_mask_helpers_round_trip() {
    let handle = std::thread::spawn(|| {
        let before = DispositionSnapshot::capture(Signal::SIGUSR1).unwrap();

        let previous = block_in_current_thread(Signal::SIGUSR1).unwrap();
        assert!(DispositionSnapshot::capture(Signal::SIGUSR1).unwrap().blocked);

        let blocked = unblock_in_current_thread(Signal::SIGUSR1).unwrap();
        assert!(blocked.contains(Signal::SIGUSR1));
        assert!(!DispositionSnapshot::capture(Signal::SIGUSR1).unwrap().blocked);

        restore_thread_mask(&previous).unwrap();
        assert_eq!(DispositionSnapshot::capture(Signal::SIGUSR1).unwrap(), before);
    });
    handle.join().unwrap();
}

#[test]
fn test_default_action_record() {
    let action = RawDisposition::default_action();
    assert!(action.is_default());
    assert!(!action.is_ignore());
    assert_eq!(action.flags() & libc::SA_RESTART as i32, libc::SA_RESTART as i32);
}

#[test]
fn test_current_pid_matches_std() {
    assert_eq!(current_pid() as u32, std::process::id());
}
