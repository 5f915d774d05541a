use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fp_app::{
    AppResult, Command, CommandQueue, SimulationContext, SimulationSetup, Trajectory,
    TrajectoryStatus, build_setup, load_scenario,
};
use fp_core::units::deg;
use fp_sim::SimProgress;

#[derive(Parser)]
#[command(name = "fp-cli")]
#[command(about = "Foucault pendulum simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file
    Validate {
        /// Path to the scenario (YAML or JSON)
        scenario_path: PathBuf,
    },
    /// Compute a trajectory and print a summary
    Run {
        /// Path to the scenario (YAML or JSON)
        scenario_path: PathBuf,
        /// Override the release angle in degrees
        #[arg(long)]
        release_angle_deg: Option<f64>,
        /// Write t, x, y, z as CSV to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Play a trajectory back in real time, reading commands from stdin
    ///
    /// Commands: `angle <deg>`, `rate <hz>`, `trail on|off`, `apply`, `quit`.
    Play {
        /// Path to the scenario (YAML or JSON)
        scenario_path: PathBuf,
        /// Stop after this many frames
        #[arg(long)]
        frames: Option<usize>,
        /// Print every frame instead of the last one per tick
        #[arg(long)]
        verbose: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            release_angle_deg,
            output,
        } => cmd_run(&scenario_path, release_angle_deg, output.as_deref()),
        Commands::Play {
            scenario_path,
            frames,
            verbose,
        } => cmd_play(&scenario_path, frames, verbose),
    }
}

fn load_setup(scenario_path: &Path) -> AppResult<SimulationSetup> {
    let scenario = load_scenario(scenario_path)?;
    build_setup(&scenario)
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let setup = load_setup(scenario_path)?;
    println!("✓ Scenario is valid: {}", setup.name);
    println!("  Samples: {}", setup.solver.grid().len());
    println!("  Integrator: {:?}", setup.solver.options.integrator);
    let geometry = &setup.solver.geometry;
    println!(
        "  Scene: pivot at {:.1} m, rod {:.1} m, bob radius {:.2} m",
        geometry.pivot.y, geometry.rod_length_m, geometry.bob_radius_m
    );
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    release_angle_deg: Option<f64>,
    output: Option<&Path>,
) -> AppResult<()> {
    let mut setup = load_setup(scenario_path)?;
    if let Some(degrees) = release_angle_deg {
        fp_project::validate_release_angle(degrees)?;
        setup.initial = setup.initial.with_release(deg(degrees));
    }

    let grid = setup.solver.grid().clone();
    println!("Running scenario: {}", setup.name);
    println!(
        "  {} samples, t = {:.3} .. {:.3} s",
        grid.len(),
        grid.start(),
        grid.start() + grid.duration()
    );

    let started = Instant::now();
    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let trajectory = setup.solver.compute_trajectory_with(
        setup.initial,
        None,
        Some(&mut |p: &SimProgress| {
            let fraction = p.fraction_complete();
            let emit_now = (fraction - last_fraction).abs() >= 0.005
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(p, started.elapsed().as_secs_f64());
                last_fraction = fraction;
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!("✓ Trajectory computed in {:.3}s", started.elapsed().as_secs_f64());
    print_summary(&trajectory);
    println!(
        "  Plane rotation: {:.3}°/h",
        setup.solver.constants.precession_rate().to_degrees() * 3600.0
    );
    if let Some(clearance) = setup.solver.geometry.lowest_clearance(&trajectory) {
        println!("  Bob clearance:  {:.4} m", clearance);
    }

    if let Some(path) = output {
        let mut csv = String::from("t_s,x_m,y_m,z_m\n");
        for (t, p) in grid.times().iter().zip(trajectory.positions()) {
            csv.push_str(&format!("{},{},{},{}\n", t, p.x, p.y, p.z));
        }
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} samples to {}",
            trajectory.len(),
            path.display()
        );
    }

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(p: &SimProgress, elapsed_s: f64) {
    let width = 28usize;
    let fraction = p.fraction_complete();
    let filled = ((fraction * width as f64).round() as usize).min(width);
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    print!(
        "\r[{}] {:>6.2}%  t={:.2}s  sample={}/{}  steps={}  rejected={}  elapsed={:.1}s",
        bar,
        fraction * 100.0,
        p.t,
        p.sample,
        p.total_samples,
        p.stats.accepted_steps,
        p.stats.rejected_steps,
        elapsed_s
    );
    let _ = io::stdout().flush();
}

fn print_summary(trajectory: &Trajectory) {
    let stats = trajectory.stats();
    let initial = trajectory.initial_conditions();
    println!("\nSummary:");
    println!("  Samples:        {}", trajectory.len());
    println!(
        "  Release angle:  {:.3}°",
        initial.polar_rad.to_degrees()
    );
    println!("  Accepted steps: {}", stats.accepted_steps);
    println!("  Rejected steps: {}", stats.rejected_steps);
    println!("  Vertical offset: {:.4} m", trajectory.vertical_offset());
    if let (Some(lo), Some(hi)) = (trajectory.lowest_height(), trajectory.highest_height()) {
        println!("  Height range:   {:.4} .. {:.4} m", lo, hi);
    }
    let polar = &trajectory.angles().polar;
    if let (Some(lo), Some(hi)) = (
        polar.iter().copied().reduce(f64::min),
        polar.iter().copied().reduce(f64::max),
    ) {
        println!(
            "  Polar angle:    {:.3}° .. {:.3}°",
            lo.to_degrees(),
            hi.to_degrees()
        );
    }
}

/// Forward command lines to `queue`. `quit` raises `quit`; end of input
/// raises `closed` so playback can still run to completion.
fn spawn_stdin_reader(queue: &CommandQueue, quit: Arc<AtomicBool>, closed: Arc<AtomicBool>) {
    let tx = queue.sender();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("quit") {
                quit.store(true, Ordering::Relaxed);
                return;
            }
            match line.parse::<Command>() {
                Ok(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        closed.store(true, Ordering::Relaxed);
    });
}

fn cmd_play(scenario_path: &Path, max_frames: Option<usize>, verbose: bool) -> AppResult<()> {
    let setup = load_setup(scenario_path)?;
    println!("Playing scenario: {}", setup.name);
    println!("  Commands: angle <deg> | rate <hz> | trail on|off | apply | quit");

    let mut ctx = SimulationContext::from_setup(setup)?.with_background_apply(true);
    let queue = CommandQueue::new();
    let quit = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(AtomicBool::new(false));
    spawn_stdin_reader(&queue, quit.clone(), closed.clone());

    ctx.apply();

    let idle = Duration::from_millis(50);
    let mut emitted = 0usize;
    let mut last_status = ctx.status().clone();
    let mut last_tick = Instant::now();

    while !quit.load(Ordering::Relaxed) {
        ctx.drain(&queue);

        let now = Instant::now();
        let frames = ctx.advance(now - last_tick);
        last_tick = now;

        if ctx.status() != &last_status {
            last_status = ctx.status().clone();
            match &last_status {
                TrajectoryStatus::Computing => println!("… computing trajectory"),
                TrajectoryStatus::Ready => {
                    clear_progress_line();
                    println!("✓ trajectory ready");
                }
                TrajectoryStatus::Degraded { reason } => {
                    clear_progress_line();
                    println!("✗ {reason}");
                }
                TrajectoryStatus::Empty => {}
            }
        }
        if let Some((sample, total)) = ctx.worker_progress() {
            print!("\r  computing {sample}/{total}");
            let _ = io::stdout().flush();
        }

        let shown: Vec<_> = if verbose {
            frames.iter().collect()
        } else {
            frames.last().into_iter().collect()
        };
        if frames.iter().any(|f| f.clear_trail) {
            println!("  (trail cleared)");
        }
        for frame in shown {
            println!(
                "t={:>8.2}s  bob=({:>8.4}, {:>8.4}, {:>8.4})  rod=({:>8.4}, {:>8.4}, {:>8.4}){}",
                frame.time_s,
                frame.bob.x,
                frame.bob.y,
                frame.bob.z,
                frame.rod.x,
                frame.rod.y,
                frame.rod.z,
                if frame.trail { "  trail" } else { "" }
            );
        }

        emitted += frames.len();
        if max_frames.is_some_and(|limit| emitted >= limit) {
            break;
        }
        if ctx.is_finished() {
            println!("✓ end of trajectory");
            break;
        }
        if ctx.awaits_command() && closed.load(Ordering::Relaxed) {
            println!("✗ playback cannot continue without input");
            break;
        }

        let interval = ctx.frame_interval().map_or(idle, |d| d.min(idle));
        std::thread::sleep(interval);
    }

    tracing::debug!(frames = emitted, "playback finished");
    println!("Played {} frames", emitted);
    Ok(())
}
