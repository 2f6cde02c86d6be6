use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framebatch_common::error::{FrameBatchError, FrameBatchResult};
use framebatch_model::frame::{FrameRange, SceneTimeline};
use framebatch_model::settings::ExportSettings;
use framebatch_planner::plan;
use framebatch_sequencer::{
    drive, AutoBatchController, CompletionPolicy, ExportBackend, ExportJob, FileSystem, Phase,
    SceneHost, SequencerSession, SessionState, Tick,
};

/// In-memory filesystem shared between the test, the backend, and the
/// sequencer.
#[derive(Clone, Default)]
struct SimFs {
    inner: Arc<Mutex<SimState>>,
}

#[derive(Default)]
struct SimState {
    files: HashMap<PathBuf, u64>,
    dirs: HashSet<PathBuf>,
    calls: usize,
}

impl SimFs {
    fn write(&self, path: &Path, size: u64) {
        self.inner.lock().unwrap().files.insert(path.to_path_buf(), size);
    }

    fn mkdir(&self, path: &Path) {
        self.inner.lock().unwrap().dirs.insert(path.to_path_buf());
    }

    fn has_file(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().files.contains_key(path)
    }

    fn has_dir(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls
    }
}

impl FileSystem for SimFs {
    fn exists(&self, path: &Path) -> bool {
        let mut state = self.inner.lock().unwrap();
        state.calls += 1;
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        let mut state = self.inner.lock().unwrap();
        state.calls += 1;
        state
            .files
            .get(path)
            .copied()
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }

    fn is_dir(&self, path: &Path) -> bool {
        let mut state = self.inner.lock().unwrap();
        state.calls += 1;
        state.dirs.contains(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.calls += 1;
        state.files.remove(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.calls += 1;
        state.dirs.remove(path);
        Ok(())
    }
}

/// Collects formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Records jobs and, optionally, writes a finished file of `instant_size`
/// bytes the moment an export starts.
#[derive(Default)]
struct SimBackend {
    jobs: Vec<ExportJob>,
    fs: Option<SimFs>,
    instant_size: u64,
    fail_frames: Vec<i64>,
}

impl ExportBackend for SimBackend {
    fn export(&mut self, job: &ExportJob) -> FrameBatchResult<()> {
        if self.fail_frames.contains(&job.frame_start) {
            return Err(FrameBatchError::export("exporter refused the job"));
        }
        self.jobs.push(job.clone());
        if let Some(fs) = &self.fs {
            fs.write(&job.output_path, self.instant_size);
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "sim"
    }
}

fn settings() -> ExportSettings {
    ExportSettings {
        filepath: "/renders/".to_string(),
        filename: "city.orbx".to_string(),
        batch_enabled: true,
        auto_batch: true,
        ..Default::default()
    }
}

fn start(controller: &mut AutoBatchController, current_frame: i64) -> SequencerSession {
    let chunk_plan = plan(FrameRange::new(0, 45).unwrap(), 20, false, 0).unwrap();
    controller
        .start(&settings(), &chunk_plan, current_frame, Path::new("/work"))
        .unwrap()
}

fn host() -> SceneHost {
    SceneHost::new(settings(), SceneTimeline::new(0, 45))
}

#[test]
fn advances_on_third_unchanged_poll_after_growth_stops() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();
    let target = PathBuf::from("/renders/city_F_0.orbx");

    // Idle tick fires the export.
    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.phase(), Phase::Waiting);
    assert_eq!(backend.jobs.len(), 1);

    // Two polls with nothing on disk.
    session.tick(&mut host, &mut backend, &fs);
    session.tick(&mut host, &mut backend, &fs);

    // The exporter writes for a few polls.
    for size in [1_000, 5_000, 9_000] {
        fs.write(&target, size);
        session.tick(&mut host, &mut backend, &fs);
        assert_eq!(session.current_index(), 0);
    }

    // Growth has stopped: two unchanged polls are not enough.
    session.tick(&mut host, &mut backend, &fs);
    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.status().stable_count, 2);

    let tick = session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.current_index(), 1);
    assert_eq!(session.phase(), Phase::Idle);
    // Cooldown-adjusted delay: max(0.5, 1.0 + 0.0).
    assert_eq!(tick, Tick::Reschedule(Duration::from_secs(1)));
}

#[test]
fn size_change_resets_stability() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();
    let target = PathBuf::from("/renders/city_F_0.orbx");

    session.tick(&mut host, &mut backend, &fs);
    fs.write(&target, 100);
    session.tick(&mut host, &mut backend, &fs);
    session.tick(&mut host, &mut backend, &fs);
    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.status().stable_count, 2);

    fs.write(&target, 200);
    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.status().stable_count, 0);
    assert_eq!(session.status().last_observed_size, 200);
    assert_eq!(session.current_index(), 0);
}

#[test]
fn missing_output_times_out_with_warning() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();

    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();

    tracing::subscriber::with_default(subscriber, || {
        session.tick(&mut host, &mut backend, &fs);
        for _ in 0..600 {
            let tick = session.tick(&mut host, &mut backend, &fs);
            assert_eq!(tick, Tick::Reschedule(Duration::from_secs(1)));
        }
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.status().poll_count, 600);
        assert!(logs.contents().is_empty());

        session.tick(&mut host, &mut backend, &fs);
    });

    assert_eq!(session.current_index(), 1);
    assert_eq!(session.status().timed_out, 1);

    let output = logs.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("Timeout waiting for city_F_0.orbx"), "{output}");
    assert!(output.contains("polls=601"), "{output}");
}

#[test]
fn stop_between_ticks_has_no_side_effects() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();

    session.tick(&mut host, &mut backend, &fs);
    let calls_before = fs.calls();

    controller.stop();
    assert_eq!(session.tick(&mut host, &mut backend, &fs), Tick::Done);
    assert_eq!(fs.calls(), calls_before);
    assert_eq!(backend.jobs.len(), 1);
    assert_eq!(session.state(), SessionState::Stopped);

    // Stays terminated.
    assert_eq!(session.tick(&mut host, &mut backend, &fs), Tick::Done);
    assert_eq!(fs.calls(), calls_before);
}

#[test]
fn stale_output_and_assets_removed_before_export() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();
    let target = PathBuf::from("/renders/city_F_0.orbx");
    let assets = PathBuf::from("/renders/city_F_0 assets");
    fs.write(&target, 42);
    fs.mkdir(&assets);

    session.tick(&mut host, &mut backend, &fs);

    assert!(!fs.has_file(&target));
    assert!(!fs.has_dir(&assets));
    assert_eq!(backend.jobs[0].output_path, target);
}

#[test]
fn failed_export_is_skipped() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend {
        fail_frames: vec![0],
        ..Default::default()
    };
    let fs = SimFs::default();

    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.current_index(), 1);
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.status().failed, 1);
}

#[test]
fn full_run_completes_and_restores_playhead() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 12);
    let mut host = host();
    host.scene.current = 12;
    let fs = SimFs::default();
    let mut backend = SimBackend {
        fs: Some(fs.clone()),
        instant_size: 4_096,
        ..Default::default()
    };

    let mut seen_frames = Vec::new();
    let mut ticks = 0;
    loop {
        let tick = session.tick(&mut host, &mut backend, &fs);
        if session.phase() == Phase::Waiting {
            seen_frames.push(host.scene.current);
        }
        ticks += 1;
        if tick == Tick::Done {
            break;
        }
        assert!(ticks < 100, "session never finished");
    }

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(host.scene.current, 12);
    assert!(seen_frames.contains(&20));
    assert!(!controller.is_running());

    let outcome = session.outcome();
    assert_eq!(outcome.completed, 3);
    assert_eq!(outcome.total, 3);
    assert_eq!(
        backend
            .jobs
            .iter()
            .map(|j| (j.frame_start, j.frame_end))
            .collect::<Vec<_>>(),
        vec![(0, 19), (20, 39), (40, 45)]
    );
}

#[test]
fn custom_policy_changes_thresholds() {
    let mut controller = AutoBatchController::with_policy(CompletionPolicy {
        stable_polls: 1,
        max_polls: 2,
    });
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();

    session.tick(&mut host, &mut backend, &fs);
    session.tick(&mut host, &mut backend, &fs);
    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.current_index(), 0);
    session.tick(&mut host, &mut backend, &fs);
    assert_eq!(session.current_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn driver_runs_session_to_completion() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 5);
    let mut host = host();
    host.settings.batch.cooldown_secs = 2.0;
    let fs = SimFs::default();
    let mut backend = SimBackend {
        fs: Some(fs.clone()),
        instant_size: 1_024,
        ..Default::default()
    };

    let started = tokio::time::Instant::now();
    let outcome = drive(&mut session, &mut host, &mut backend, &fs).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.completed, 3);
    assert_eq!(backend.jobs.len(), 3);
    assert_eq!(host.scene.current, 5);

    // First tick after 1s. Per chunk: 1s after starting, three 1s polls
    // (the first sees the new size), then the settling poll reschedules
    // with the 3s cooldown-adjusted delay.
    let elapsed = started.elapsed();
    let expected = Duration::from_secs(1 + 3 * (1 + 1 + 1 + 1 + 3));
    assert!(elapsed >= expected, "{elapsed:?}");
    assert!(elapsed < expected + Duration::from_secs(1), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn driver_observes_stop_handle() {
    let mut controller = AutoBatchController::new();
    let mut session = start(&mut controller, 0);
    let mut host = host();
    let mut backend = SimBackend::default();
    let fs = SimFs::default();

    let handle = session.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.stop();
    });

    let outcome = drive(&mut session, &mut host, &mut backend, &fs).await;
    assert_eq!(outcome.state, SessionState::Stopped);
    assert_eq!(outcome.completed, 0);
    assert_eq!(backend.jobs.len(), 1);
}
