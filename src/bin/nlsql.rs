//! nlsql: plain-English requests to SQL
//!
//! # Usage
//!
//! ```bash
//! # Print the SQL for a request
//! nlsql --schema schema.json "top 10 members joined after 2023-01-01"
//!
//! # Intent and SQL as JSON
//! nlsql "members with status in active, pending" --format json
//!
//! # Render a hand-edited intent
//! nlsql build intent.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use nlsql::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nlsql")]
#[command(version)]
#[command(about = "Plain-English data requests in, reviewable SQL out", long_about = None)]
#[command(after_help = "EXAMPLES:
    nlsql --schema schema.json 'top 5 members'
    nlsql 'members per breach source, having count > 2' --format json
    nlsql explain 'unique member emails sorted by join date in descending order'
    nlsql build intent.json")]
struct Cli {
    /// The request to translate
    request: Option<String>,

    /// Output format (overrides the settings file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Print the parsed intent before the SQL
    #[arg(short, long)]
    verbose: bool,

    /// Schema document (JSON or TOML)
    #[arg(long, global = true, env = "NLSQL_SCHEMA")]
    schema: Option<PathBuf>,

    /// Settings file (default: ./nlsql.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the parsed intent and the generated SQL
    Explain {
        /// The request to explain
        request: String,
    },
    /// Render an intent JSON file as SQL
    Build {
        /// Path to the intent file
        intent: PathBuf,
    },
    /// List configured entities and their aliases
    Entities,
    /// Interactive REPL mode
    Repl,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    init_logging(&settings.log_level);

    match &cli.command {
        Some(Commands::Explain { request }) => explain_request(request, &load_registry(cli, &settings)?),
        Some(Commands::Build { intent }) => build_from_file(intent, &load_registry(cli, &settings)?),
        Some(Commands::Entities) => {
            show_entities(&load_registry(cli, &settings)?);
            Ok(())
        }
        Some(Commands::Repl) => {
            run_repl(&load_registry(cli, &settings)?);
            Ok(())
        }
        None => match &cli.request {
            Some(request) => translate_request(request, cli, &settings),
            None => {
                println!("{}", "nlsql: plain-English requests to SQL".cyan().bold());
                println!();
                println!("Usage: nlsql <REQUEST> [OPTIONS]");
                println!();
                println!("Try: nlsql --help");
                Ok(())
            }
        },
    }
}

/// `RUST_LOG` wins; otherwise the settings level. Logs go to stderr.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_registry(cli: &Cli, settings: &Settings) -> Result<SchemaRegistry> {
    let path = cli
        .schema
        .as_ref()
        .or(settings.schema_path.as_ref())
        .context("No schema file. Use --schema, set NLSQL_SCHEMA or add schema_path to nlsql.toml")?;
    Ok(SchemaRegistry::load(path)?)
}

fn translate_request(request: &str, cli: &Cli, settings: &Settings) -> Result<()> {
    let registry = load_registry(cli, settings)?;
    let format = cli.format.unwrap_or(settings.format);

    let intent = parse_nl_to_intent(request, &registry)?;
    let sql = build_sql(&intent, &registry)?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "intent": intent, "sql": sql });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Sql => {
            if cli.verbose || settings.show_intent {
                println!("{} {}", "Input:".dimmed(), request.yellow());
                println!("{}", "Intent:".cyan().bold());
                println!("{}", serde_json::to_string_pretty(&intent)?.dimmed());
                println!();
            }
            println!("{}", sql);
        }
    }
    Ok(())
}

fn build_from_file(path: &Path, registry: &SchemaRegistry) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read intent file '{}'", path.display()))?;
    let intent: QueryIntent = serde_json::from_str(&content)
        .with_context(|| format!("Invalid intent JSON in '{}'", path.display()))?;
    println!("{}", build_sql(&intent, registry)?);
    Ok(())
}

fn explain_request(request: &str, registry: &SchemaRegistry) -> Result<()> {
    println!("{}", "nlsql Request Explanation".cyan().bold());
    println!();
    println!("{} {}", "Request:".dimmed(), request.yellow());
    println!();

    let intent = parse_nl_to_intent(request, registry)?;

    println!("{}", "Parsed Intent:".green().bold());
    println!("  {} {}", "Entity:".dimmed(), intent.entity.cyan());

    if intent.fields.is_empty() {
        println!("  {} {}", "Fields:".dimmed(), "* (all columns)".white());
    } else {
        println!("  {}", "Fields:".dimmed());
        for field in &intent.fields {
            println!("    • {}", field.to_string().white());
        }
    }
    println!("  {} {}", "Distinct:".dimmed(), intent.distinct);

    print_filters("Filters:", &intent.filters);

    if !intent.group_by.is_empty() {
        let cols: Vec<String> = intent.group_by.iter().map(ToString::to_string).collect();
        println!("  {} {}", "Group by:".dimmed(), cols.join(", ").white());
    }

    print_filters("Having:", &intent.having);

    if !intent.sort.is_empty() {
        println!("  {}", "Sort:".dimmed());
        for sort in &intent.sort {
            println!("    {} {}", sort.field.to_string().white(), sort.direction.to_string().cyan());
        }
    }

    match intent.limit {
        Some(n) => println!("  {} {}", "Limit:".dimmed(), n.to_string().cyan()),
        None => println!("  {} {}", "Limit:".dimmed(), "none".dimmed()),
    }

    println!();
    println!("{}", "Generated SQL:".green().bold());
    for line in build_sql(&intent, registry)?.lines() {
        println!("  {}", line.white());
    }
    Ok(())
}

fn print_filters(label: &str, filters: &[FilterIntent]) {
    if filters.is_empty() {
        return;
    }
    println!("  {}", label.dimmed());
    for (i, f) in filters.iter().enumerate() {
        let joiner = if i == 0 { String::new() } else { format!("{} ", f.logical) };
        println!(
            "    {}{} {} {}",
            joiner.dimmed(),
            f.field.to_string().white(),
            f.operator.to_string().cyan(),
            f.value.to_string().yellow()
        );
    }
}

fn show_entities(registry: &SchemaRegistry) {
    println!("{}", "Configured Entities".cyan().bold());
    println!();

    for (name, entity) in &registry.config().entities {
        let table = match &entity.table {
            Some(t) => t.white(),
            None => "(no table)".yellow(),
        };
        println!("{} {} {}", name.cyan().bold(), "→".dimmed(), table);
        if !entity.aliases.is_empty() {
            println!("  {} {}", "aliases:".dimmed(), entity.aliases.join(", "));
        }
        if !entity.details_bundle.is_empty() {
            println!("  {} {}", "details:".dimmed(), entity.details_bundle.join(", "));
        }
        for (col, aliases) in registry.column_aliases(name) {
            println!("    {:20} {}", col.white(), aliases.join(", ").dimmed());
        }
        println!();
    }
}

/// Run the interactive REPL mode.
fn run_repl(registry: &SchemaRegistry) {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    println!("{}", "nlsql REPL: Interactive Mode".cyan().bold());
    println!("{}", "Type a request to see the generated SQL. Commands:".dimmed());
    println!("  {}     - Exit the REPL", ".exit".yellow());
    println!("  {}     - Show help", ".help".yellow());
    println!("  {} - List entities", ".entities".yellow());
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{} {}", "Failed to initialize REPL:".red(), e);
            return;
        }
    };

    let history_path = dirs::home_dir()
        .map(|p| p.join(".nlsql_history"))
        .unwrap_or_default();
    let _ = rl.load_history(&history_path);

    loop {
        let prompt = "nlsql> ".cyan().bold().to_string();
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ".exit" | ".quit" | "exit" | "quit" => {
                        println!("{}", "Goodbye!".green());
                        break;
                    }
                    ".help" | "help" => {
                        show_repl_help();
                        continue;
                    }
                    ".entities" => {
                        show_entities(registry);
                        continue;
                    }
                    ".clear" | "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        continue;
                    }
                    _ => {}
                }

                match nlsql::translate(line, registry) {
                    Ok(sql) => {
                        println!("{}", sql.white().bold());
                        println!();
                    }
                    Err(e) => {
                        eprintln!("{} {}", "✗".red(), e.to_string().red());
                        if e.is_request_error() {
                            eprintln!("{}", "Try naming the entity, e.g. 'top 5 members'.".dimmed());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
}

fn show_repl_help() {
    println!("{}", "nlsql REPL Commands:".cyan().bold());
    println!("  {}     - Exit the REPL", ".exit".yellow());
    println!("  {}     - Show this help", ".help".yellow());
    println!("  {} - List entities and aliases", ".entities".yellow());
    println!("  {}    - Clear screen", ".clear".yellow());
    println!();
    println!("{}", "Request Examples:".cyan().bold());
    println!("  top 10 members joined after 2023-01-01");
    println!("  member details where status is active");
    println!("  members with status in active, pending");
    println!("  count of members per breach source, having count > 2");
    println!("  unique member emails sorted by join date in descending order");
    println!();
}
