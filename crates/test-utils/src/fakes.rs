use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use regex::Regex;
use winedeck::process::{BoxFuture, ProcessQuery};
use winedeck::window::{WindowInfo, WindowSource};

/// A scripted process table: pid -> command line.
///
/// - `find_matching` runs the pattern against the command lines
/// - `kill` removes the pid and remembers it
/// - `is_alive` remembers which thread probed
#[derive(Debug, Default)]
pub struct FakeProcesses {
    table: Mutex<BTreeMap<u32, String>>,
    killed: Mutex<Vec<u32>>,
    searches: AtomicUsize,
    probe_threads: Mutex<Vec<ThreadId>>,
}

impl FakeProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, cmdline: &str) -> Self {
        self.spawn(pid, cmdline);
        self
    }

    pub fn spawn(&self, pid: u32, cmdline: &str) {
        self.table.lock().unwrap().insert(pid, cmdline.to_string());
    }

    pub fn exit(&self, pid: u32) {
        self.table.lock().unwrap().remove(&pid);
    }

    pub fn exit_all(&self) {
        self.table.lock().unwrap().clear();
    }

    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().unwrap().clone()
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Threads that ran a liveness probe, in call order.
    pub fn probe_threads(&self) -> Vec<ThreadId> {
        self.probe_threads.lock().unwrap().clone()
    }
}

impl ProcessQuery for FakeProcesses {
    fn find_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Vec<u32>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let pids = match Regex::new(pattern) {
            Ok(re) => self
                .table
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, cmd)| re.is_match(cmd))
                .map(|(pid, _)| *pid)
                .collect(),
            Err(_) => Vec::new(),
        };
        Box::pin(async move { pids })
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.probe_threads.lock().unwrap().push(thread::current().id());
        self.table.lock().unwrap().contains_key(&pid)
    }

    fn kill(&self, pid: u32) -> bool {
        let removed = self.table.lock().unwrap().remove(&pid).is_some();
        if removed {
            self.killed.lock().unwrap().push(pid);
        }
        removed
    }
}

/// A window list that can replay one frame per query.
///
/// Scripted frames are consumed first; after that every query returns the
/// steady-state list set with [`FakeWindows::set_windows`].
#[derive(Debug, Default)]
pub struct FakeWindows {
    frames: Mutex<VecDeque<Vec<WindowInfo>>>,
    steady: Mutex<Vec<WindowInfo>>,
    activated: Mutex<Vec<u32>>,
    query_threads: Mutex<Vec<ThreadId>>,
}

impl FakeWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(frames: Vec<Vec<WindowInfo>>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
            ..Self::default()
        }
    }

    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        *self.steady.lock().unwrap() = windows;
    }

    pub fn activated(&self) -> Vec<u32> {
        self.activated.lock().unwrap().clone()
    }

    /// Threads that listed windows, in call order.
    pub fn query_threads(&self) -> Vec<ThreadId> {
        self.query_threads.lock().unwrap().clone()
    }
}

impl WindowSource for FakeWindows {
    fn on_screen_windows(&self) -> Vec<WindowInfo> {
        self.query_threads.lock().unwrap().push(thread::current().id());
        match self.frames.lock().unwrap().pop_front() {
            Some(frame) => frame,
            None => self.steady.lock().unwrap().clone(),
        }
    }

    fn activate<'a>(&'a self, pid: u32) -> BoxFuture<'a, anyhow::Result<()>> {
        self.activated.lock().unwrap().push(pid);
        Box::pin(async { Ok(()) })
    }
}

/// A big, opaque window owned by `owner`.
pub fn window(pid: u32, owner: &str) -> WindowInfo {
    WindowInfo {
        pid,
        owner_name: owner.to_string(),
        width: 800.0,
        height: 600.0,
        alpha: 1.0,
    }
}
