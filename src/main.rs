use clap::Parser;
use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};
use confapply::cli::{Cli, Command};
use confapply::engine::{ApplyError, Engine};
use confapply::request::{ApplyRequest, StageOutcome, WriteOutcome};
use confapply::{init, pid, shell, sys};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Apply { file } => run_apply(&file, cli.json).await,
        Command::Pid { spec } => run_pid(&spec, cli.json).await,
        Command::Init => init::run(&std::env::current_dir()?),
    }
}

async fn run_apply(file: &str, json: bool) -> color_eyre::Result<()> {
    let raw = if file == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| color_eyre::eyre::eyre!("failed to read {file}: {e}"))?
    };
    let request: ApplyRequest = serde_json::from_str(&raw)
        .map_err(|e| color_eyre::eyre::eyre!("failed to parse {file}: {e}"))?;

    match Engine::new().apply(&request).await {
        Ok(results) => {
            if json {
                print_json(&results, None);
            } else {
                print_results(&results);
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                print_json(&failure.completed, Some(&failure.error));
            } else {
                print_results(&failure.completed);
                eprintln!("{} {}", "error:".red().bold(), failure.error);
            }
            let code = if failure.error.is_client_error() { 2 } else { 1 };
            std::process::exit(code);
        }
    }
}

async fn run_pid(spec: &str, json: bool) -> color_eyre::Result<()> {
    let resolved = pid::find_pid(spec, &shell::ShellRunner).await;
    if resolved.is_empty() {
        color_eyre::eyre::bail!("could not resolve a pid from `{spec}`");
    }

    if let Ok(n) = resolved.trim().parse::<u32>()
        && !sys::is_pid_alive(n)
    {
        tracing::warn!("pid {n} is not alive");
    }

    if json {
        println!("{}", serde_json::json!({ "pid": resolved }));
    } else {
        println!("{}", resolved.trim_end());
    }
    Ok(())
}

fn print_json(results: &[StageOutcome], error: Option<&ApplyError>) {
    let error = error.map(|e| {
        serde_json::json!({
            "kind": if e.is_client_error() { "config" } else { "environment" },
            "message": e.to_string(),
        })
    });
    let body = serde_json::json!({ "results": results, "error": error });
    println!("{body}");
}

fn outcome_cell(outcome: &WriteOutcome) -> Cell {
    match outcome {
        WriteOutcome::Unchanged => Cell::new("unchanged"),
        WriteOutcome::Created => Cell::new("created").fg(Color::Green),
        WriteOutcome::Replaced { backup } => {
            Cell::new(format!("replaced (backup: {backup})")).fg(Color::Cyan)
        }
    }
}

fn print_results(results: &[StageOutcome]) {
    if results.is_empty() {
        println!("{}", "nothing to do".yellow());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["stage", "target", "result"]);

    for result in results {
        match result {
            StageOutcome::Primary { path, outcome } => {
                table.add_row(vec![
                    Cell::new("primary").fg(Color::Cyan),
                    Cell::new(path),
                    outcome_cell(outcome),
                ]);
            }
            StageOutcome::SubsCleared { dir, backed_up } => {
                table.add_row(vec![
                    Cell::new("subs").fg(Color::Cyan),
                    Cell::new(dir),
                    Cell::new(format!("backed up {backed_up} existing files")).fg(Color::Yellow),
                ]);
            }
            StageOutcome::Sub { file, outcome } => {
                table.add_row(vec![
                    Cell::new("sub").fg(Color::Cyan),
                    Cell::new(file),
                    outcome_cell(outcome),
                ]);
            }
            StageOutcome::Reload { command, output } => {
                let result = match output.first() {
                    Some(line) => format!("ok: {line}"),
                    None => "ok".to_string(),
                };
                table.add_row(vec![
                    Cell::new("reload").fg(Color::Cyan),
                    Cell::new(command),
                    Cell::new(result).fg(Color::Green),
                ]);
            }
        }
    }

    println!("{table}");
}
