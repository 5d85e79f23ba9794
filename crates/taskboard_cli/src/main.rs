use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskboard_cli::cli::{Cli, Command, ConfigOverride, ListCommand, parse_config_override};
use taskboard_core::clock::{Clock, SystemClock};
use taskboard_core::config::{self, Config, ConfigOverrides, Palette};
use taskboard_core::error::AppError;
use taskboard_core::model::{Task, TaskId};
use taskboard_core::session::Session;
use taskboard_core::storage::JsonFileStorage;
use time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "TASKBOARD_LOG";

type Board = Session<JsonFileStorage, SystemClock>;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

fn task_rows(tasks: &[Task]) -> Vec<TaskRow> {
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| TaskRow {
            position: index + 1,
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            created_at: task.created_at.clone(),
        })
        .collect()
}

fn print_section(heading: &str, tasks: &[Task], palette: &Palette) {
    println!("{} ({})", palette.accent(heading), tasks.len());
    if tasks.is_empty() {
        println!("{}", palette.muted("  nothing here"));
        return;
    }
    let mut table = Table::new(task_rows(tasks));
    table.with(Style::psql());
    println!("{table}");
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "status": task.status,
        "createdAt": task.created_at,
    })
}

fn print_task_json(task: &Task) {
    println!("{}", task_json(task));
}

fn tasks_json(tasks: &[Task]) -> serde_json::Value {
    serde_json::Value::Array(tasks.iter().map(task_json).collect())
}

fn days_until_reset(board: &Board) -> i64 {
    let next_reset = board.last_reset_at() + Duration::days(i64::from(board.decay_days()));
    (next_reset - SystemClock.now()).whole_days().max(0)
}

fn print_score(board: &Board, json: bool, palette: &Palette) -> Result<(), AppError> {
    let tier = board.score_tier();
    let last_reset_at = board
        .last_reset_at()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "score": board.current_score(),
                "tier": tier.label(),
                "message": tier.message(),
                "lastResetDate": last_reset_at,
                "daysUntilReset": days_until_reset(board),
            })
        );
    } else {
        println!(
            "Productivity score: {} {}",
            palette.accent(&board.current_score().to_string()),
            tier.badge()
        );
        println!("{}", tier.message());
        println!(
            "{}",
            palette.muted(&format!(
                "Last reset {last_reset_at}; resets every {} days ({} left)",
                board.decay_days(),
                days_until_reset(board)
            ))
        );
    }

    Ok(())
}

// Interactive lines and argv both go through clap; its rendered error is
// multi-line with usage hints, so only the headline is kept.
fn usage_error(err: clap::Error) -> AppError {
    let rendered = err.render().to_string();
    let headline = rendered
        .lines()
        .find_map(|line| line.strip_prefix("error: "))
        .unwrap_or("invalid command");
    AppError::validation(format!("{headline} (type 'help' for usage)"))
}

/// Splits an interactive line into arguments. Single or double quotes group
/// words; inside double quotes `\"` and `\\` are escapes.
fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return Ok(args);
        }

        let mut word = String::new();
        while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace()) {
            match ch {
                '\'' => loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => word.push(inner),
                        None => return Err(unterminated(ch)),
                    }
                },
                '"' => loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') if matches!(chars.peek(), Some('"' | '\\')) => {
                            word.extend(chars.next());
                        }
                        Some(inner) => word.push(inner),
                        None => return Err(unterminated(ch)),
                    }
                },
                _ => word.push(ch),
            }
        }
        args.push(word);
    }
}

fn unterminated(quote: char) -> AppError {
    AppError::validation(format!("unterminated {quote} in command"))
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn resolve_config(overrides: &[String]) -> Result<Config, AppError> {
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        tracing::warn!(error = %err, "using default configuration");
    }

    let mut parsed = ConfigOverrides::default();
    for raw in overrides {
        match parse_config_override(raw)? {
            ConfigOverride::Theme(theme) => parsed.theme = Some(theme),
            ConfigOverride::DecayDays(days) => parsed.decay_days = Some(days),
        }
    }

    Ok(config::merge_overrides(&loaded.config, &parsed))
}

fn open_board(settings: &Config) -> Result<Board, AppError> {
    let storage = JsonFileStorage::open_default()?;
    tracing::debug!(path = %storage.path().display(), "opening task board");
    Session::open_with_decay_days(storage, SystemClock, settings.decay_days())
}

fn run_command(board: &mut Board, cli: Cli, palette: &Palette) -> Result<(), AppError> {
    match cli.command {
        Command::Add { title, description } => {
            let task = board.add(
                title.as_deref().unwrap_or_default(),
                description.as_deref().unwrap_or_default(),
            )?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Added task: {} ({})", task.title, task.id);
            }
        }
        Command::Toggle { id } => {
            let task = board.toggle(&TaskId::new(id.trim()))?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!(
                    "Marked {}: {} ({}) - score {}",
                    task.status.label(),
                    task.title,
                    task.id,
                    board.current_score()
                );
            }
        }
        Command::Delete { id } => {
            let task = board.delete(&TaskId::new(id.trim()))?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Deleted task: {} ({})", task.title, task.id);
            }
        }
        Command::Move {
            dragged_id,
            target_id,
        } => {
            let moved = board.reorder(
                &TaskId::new(dragged_id.trim()),
                &TaskId::new(target_id.trim()),
            );
            let pending = board.current_pending_ordered();
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "moved": moved, "pending": tasks_json(&pending) })
                );
            } else if moved {
                println!("Moved task: {}", dragged_id.trim());
                print_section("Pending", &pending, palette);
            } else {
                println!("Order unchanged");
            }
        }
        Command::List { list } => {
            let view = list.unwrap_or(ListCommand::All);
            let pending = board.current_pending_ordered();
            let completed = board.current_completed();
            if cli.json {
                let payload = match view {
                    ListCommand::All => serde_json::json!({
                        "pending": tasks_json(&pending),
                        "completed": tasks_json(&completed),
                    }),
                    ListCommand::Pending => tasks_json(&pending),
                    ListCommand::Completed => tasks_json(&completed),
                };
                println!("{payload}");
            } else {
                if board.current_tasks().is_empty() {
                    println!("No tasks yet. Add a new task to get started!");
                    return Ok(());
                }
                if view != ListCommand::Completed {
                    print_section("Pending", &pending, palette);
                }
                if view != ListCommand::Pending {
                    print_section("Completed", &completed, palette);
                }
            }
        }
        Command::Score => print_score(board, cli.json, palette)?,
        Command::Tick => {
            let reset = board.tick(SystemClock.now());
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "reset": reset, "score": board.current_score() })
                );
            } else if reset {
                println!("Productivity score reset");
            } else {
                println!(
                    "Productivity score unchanged ({} days until reset)",
                    days_until_reset(board)
                );
            }
        }
    }

    if let Some(err) = board.last_persistence_error() {
        eprintln!("WARNING: {}", err);
    }

    Ok(())
}

fn run_interactive(board: &mut Board, palette: &Palette) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::persistence(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskboard".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", usage_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            eprintln!("WARNING: config overrides only apply at startup");
        }

        if let Err(err) = run_command(board, cli, palette) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_once(cli: Cli) -> Result<(), AppError> {
    let settings = resolve_config(&cli.config_override)?;
    let palette = settings.theme.palette();
    let mut board = open_board(&settings)?;
    run_command(&mut board, cli, &palette)
}

fn run_session() -> Result<(), AppError> {
    let settings = resolve_config(&[])?;
    let palette = settings.theme.palette();
    let mut board = open_board(&settings)?;
    run_interactive(&mut board, &palette)
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_session() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                let _ = err.print();
                return;
            }
            eprintln!("ERROR: {}", usage_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_once(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::split_command_line;

    #[test]
    fn split_command_line_honours_quotes() {
        let args = split_command_line(r#"add "Buy milk" "two \"big\" bottles""#).unwrap();
        assert_eq!(args, vec!["add", "Buy milk", r#"two "big" bottles"#]);
    }

    #[test]
    fn split_command_line_accepts_single_quotes() {
        let args = split_command_line("  add 'Call \"Sam\"'   'C:\\notes'  ").unwrap();
        assert_eq!(args, vec!["add", r#"Call "Sam""#, r"C:\notes"]);
    }

    #[test]
    fn split_command_line_keeps_other_backslashes() {
        let args = split_command_line(r#"add "a\tb" plain\word"#).unwrap();
        assert_eq!(args, vec!["add", r"a\tb", r"plain\word"]);
    }

    #[test]
    fn split_command_line_keeps_empty_quoted_argument() {
        let args = split_command_line(r#"add "" desc"#).unwrap();
        assert_eq!(args, vec!["add", "", "desc"]);
    }

    #[test]
    fn split_command_line_rejects_unterminated_quote() {
        let err = split_command_line(r#"add "Buy milk"#).unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
