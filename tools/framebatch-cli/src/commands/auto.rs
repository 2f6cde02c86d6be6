//! Unattended batch: export every chunk, waiting for each output to settle.

use framebatch_common::config::AppConfig;
use framebatch_sequencer::{
    drive_until_interrupted, AutoBatchController, CompletionPolicy, SceneHost, SessionState,
    StdFileSystem,
};

use super::{
    command_backend, export_settings, BatchArgs, ExporterArgs, OutputArgs, PlanSource, RangeArgs,
};

pub async fn run(
    config: &AppConfig,
    range: RangeArgs,
    output: OutputArgs,
    batch: BatchArgs,
    source: PlanSource,
    exporter: ExporterArgs,
) -> anyhow::Result<()> {
    let mut settings = export_settings(config, &output, &batch)?;
    settings.auto_batch = true;

    let scene = range.scene();
    let working_dir = output.working_dir()?;
    let chunk_plan = source.resolve(&settings, &scene)?;
    let mut backend = command_backend(config, exporter)?;

    let mut controller =
        AutoBatchController::with_policy(CompletionPolicy::from(&config.completion));
    let mut session = controller.start(&settings, &chunk_plan, scene.current, &working_dir)?;

    println!(
        "Auto batch: {} chunk(s) of {} frame(s). Press Ctrl-C to stop.",
        chunk_plan.len(),
        chunk_plan.step
    );

    let mut host = SceneHost::new(settings, scene);
    let outcome =
        drive_until_interrupted(&mut session, &mut host, &mut backend, &StdFileSystem).await;

    println!();
    match outcome.state {
        SessionState::Completed => println!("Auto batch complete."),
        SessionState::Stopped => println!("Auto batch stopped."),
        SessionState::Aborted => println!("Auto batch aborted."),
        SessionState::Running => {}
    }
    println!("  Chunks settled: {}/{}", outcome.completed, outcome.total);
    if outcome.timed_out > 0 {
        println!("  Timed out: {}", outcome.timed_out);
    }
    if outcome.failed > 0 {
        println!("  Failed to start: {}", outcome.failed);
    }

    Ok(())
}
