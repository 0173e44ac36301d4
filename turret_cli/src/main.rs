mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use cli::{Cli, Commands, FILE_GUARD, FireAction, JSON_MODE};
use turret_config::Config;
use turret_traits::{Recorder, Relay};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match real_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            let code = error_fmt::exit_code_for_error(&err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let _ = color_eyre::install();

    let cfg = load_config(&cli.config)?;
    cfg.validate().wrap_err("configuration failed validation")?;
    init_tracing(&cli, &cfg)?;

    match cli.cmd {
        Commands::Run {
            duration_s,
            armed,
            rt,
            rt_prio,
        } => cmd_run(&cli, &cfg, duration_s, armed, rt, rt_prio),
        Commands::Move { pan, tilt } => cmd_move(&cli, &cfg, pan, tilt),
        Commands::Home => cmd_home(&cli, &cfg),
        Commands::SetHome { pan, tilt } => cmd_set_home(&cli, &cfg, pan, tilt),
        Commands::Fire { action } => cmd_fire(&cli, &cfg, action),
        Commands::SelfCheck => cmd_self_check(&cli, &cfg),
        Commands::Health => cmd_health(&cli, &cfg),
    }
}

/// A missing file at the default location means "run on defaults"; an
/// explicitly named file must exist.
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        if path == Path::new("etc/turret_config.toml") {
            return Ok(Config::default());
        }
        eyre::bail!("config file not found: {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    turret_config::load_toml(&text)
        .wrap_err_with(|| format!("failed to parse config {}", path.display()))
}

fn init_tracing(cli: &Cli, cfg: &Config) -> Result<()> {
    let level = cfg.logging.level.as_deref().unwrap_or(&cli.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let mut layers = Vec::new();
    let console = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };
    layers.push(console);

    if let Some(file) = cfg.logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path.file_name().unwrap_or_else(|| "turret.log".as_ref());
        let appender = match cfg.logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(filter).with(layers).init();
    Ok(())
}

fn cmd_run(
    cli: &Cli,
    cfg: &Config,
    duration_s: Option<u64>,
    armed: bool,
    rt: bool,
    rt_prio: Option<i32>,
) -> Result<()> {
    if rt {
        setup_rt(rt_prio);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let ctrlc_shutdown = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        ctrlc_shutdown.store(true, Ordering::Relaxed);
    })
    .wrap_err("failed to install Ctrl-C handler")?;

    let summary = run::run_loop(
        cfg,
        armed,
        duration_s.map(Duration::from_secs),
        &shutdown,
    )?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "frames": summary.frames,
                "feed_timeouts": summary.feed_timeouts,
                "acquisitions": summary.acquisitions,
                "losses": summary.losses,
                "moves": summary.moves,
                "final_pan_deg": summary.final_pan_deg,
                "final_tilt_deg": summary.final_tilt_deg,
                "elapsed_ms": summary.elapsed.as_millis() as u64,
            })
        );
    } else {
        println!(
            "processed {} frames ({} feed timeouts): {} acquisitions, {} losses, {} moves; final pose ({:.1}, {:.1})",
            summary.frames,
            summary.feed_timeouts,
            summary.acquisitions,
            summary.losses,
            summary.moves,
            summary.final_pan_deg,
            summary.final_tilt_deg,
        );
    }
    Ok(())
}

fn setup_rt(rt_prio: Option<i32>) {
    #[cfg(all(feature = "rt", target_os = "linux"))]
    {
        if let Err(e) = turret_hardware::rt::promote_to_realtime(rt_prio.unwrap_or(50)) {
            tracing::warn!(error = %e, "real-time setup failed, continuing without it");
        }
    }
    #[cfg(not(all(feature = "rt", target_os = "linux")))]
    {
        let _ = rt_prio;
        tracing::warn!("built without the `rt` feature; --rt ignored");
    }
}

fn cmd_move(cli: &Cli, cfg: &Config, pan: f32, tilt: f32) -> Result<()> {
    let motion = run::build_motion(cfg, run::open_servo_bank(cfg)?);
    motion.move_to(pan, tilt)?;
    let (pan, tilt) = motion.current_angles();
    print_pose(cli, pan, tilt);
    Ok(())
}

fn cmd_home(cli: &Cli, cfg: &Config) -> Result<()> {
    let motion = run::build_motion(cfg, run::open_servo_bank(cfg)?);
    motion.move_home()?;
    let (pan, tilt) = motion.current_angles();
    print_pose(cli, pan, tilt);
    Ok(())
}

fn cmd_set_home(cli: &Cli, cfg: &Config, pan: f32, tilt: f32) -> Result<()> {
    let motion = run::build_motion(cfg, run::open_servo_bank(cfg)?);
    motion.move_to(pan, tilt)?;
    motion.set_home_to_current()?;
    let (pan, tilt) = motion.home_pose();
    print_pose(cli, pan, tilt);
    Ok(())
}

fn print_pose(cli: &Cli, pan: f32, tilt: f32) {
    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "pan_deg": pan, "tilt_deg": tilt })
        );
    } else {
        println!("pose: pan {pan:.1}°, tilt {tilt:.1}°");
    }
}

fn cmd_fire(cli: &Cli, cfg: &Config, action: FireAction) -> Result<()> {
    let mut relay = run::open_relay(cfg)?;
    let on = action == FireAction::On;
    relay
        .set_active(on)
        .map_err(|e| eyre::eyre!("relay switch failed: {e}"))?;
    if cli.json {
        println!("{}", serde_json::json!({ "relay": on }));
    } else {
        println!("relay {}", if on { "on" } else { "off" });
    }
    Ok(())
}

/// Exercise each collaborator once. The relay is only pulsed when the
/// config arms it.
fn cmd_self_check(cli: &Cli, cfg: &Config) -> Result<()> {
    let motion = run::build_motion(cfg, run::open_servo_bank(cfg)?);
    motion.move_to(5.0, 5.0)?;
    motion.move_home()?;

    let relay_checked = if cfg.actuators.armed {
        let mut relay = run::open_relay(cfg)?;
        relay
            .set_active(true)
            .map_err(|e| eyre::eyre!("relay on failed: {e}"))?;
        relay
            .set_active(false)
            .map_err(|e| eyre::eyre!("relay off failed: {e}"))?;
        true
    } else {
        false
    };

    let mut recorder = run::open_recorder();
    recorder
        .start()
        .map_err(|e| eyre::eyre!("recorder start failed: {e}"))?;
    recorder
        .stop()
        .map_err(|e| eyre::eyre!("recorder stop failed: {e}"))?;
    recorder
        .restart_pipeline()
        .map_err(|e| eyre::eyre!("pipeline restart failed: {e}"))?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "servos": "ok",
                "relay": if relay_checked { "ok" } else { "skipped (not armed)" },
                "recorder": "ok",
            })
        );
    } else {
        println!(
            "self-check ok (servos ok, relay {}, recorder ok)",
            if relay_checked { "ok" } else { "skipped: not armed" }
        );
    }
    Ok(())
}

fn cmd_health(cli: &Cli, cfg: &Config) -> Result<()> {
    // validate() already ran; reaching this point means the config is sound
    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "armed": cfg.actuators.armed,
                "frame": [cfg.capture.frame_width, cfg.capture.frame_height],
            })
        );
    } else {
        println!("ok (version {})", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
