use clap::CommandFactory;
use colored::*;
use env_logger::{Builder, Env, Target};
use log::{info, warn};
use std::fs;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use versekeep::daily::{DailyPicker, JsonDailyStore};
use versekeep::output::{OutputFormat, OutputFormatter};
use versekeep::{Catalog, Cli, Commands, Config, Metrics, Parser, QueryParams, Result, VerseError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = setup_logging(&cli) {
        eprintln!("{}", format!("Could not set up logging: {e}").red());
    }

    let start_time = Instant::now();
    info!("Application started with command: {:?}", cli.command);

    if let Err(e) = run(cli).await {
        eprintln!("{}", e.to_string().red());
        std::process::exit(if e.is_user_error() { 2 } else { 1 });
    }

    info!(
        "Application finished. Total elapsed time: {:.2?}",
        start_time.elapsed()
    );
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "versekeep", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data.snapshot_dir = dir.clone();
    }
    if cli.local_only {
        config.sync.use_local_data = true;
    }

    let metrics = Arc::new(Metrics::new());
    let catalog = versekeep::build_catalog(&config, None, metrics);
    catalog.initialize_all();

    match cli.command {
        Commands::Query {
            query,
            params,
            format,
        } => {
            let params: QueryParams = params.into_iter().collect();
            let result = catalog.execute(&query, &params)?;
            print!("{}", OutputFormatter::new(format).format_result(&result)?);
        }
        Commands::Parse { query, params } => {
            let params: QueryParams = params.into_iter().collect();
            let request = catalog.parse(&query, &params);
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Commands::Export {
            dataset,
            preview,
            out,
        } => {
            let today = chrono::Local::now().date_naive();
            let export = catalog.export(&dataset, preview, today)?;
            match out {
                Some(path) => {
                    fs::write(&path, &export.body)?;
                    println!(
                        "{} {} {}",
                        "Wrote".green(),
                        dataset,
                        format!("to {}", path.display()).green()
                    );
                }
                None => {
                    if let Some(filename) = &export.filename {
                        info!("Suggested filename: {filename}");
                    }
                    println!("{}", export.body);
                }
            }
        }
        Commands::Today { chapter } => {
            let store = Arc::new(JsonDailyStore::new(config.data.daily_dir.clone()));
            let picker = DailyPicker::new(&catalog, store);
            let today = chrono::Local::now().date_naive();

            let reference = if chapter {
                picker.chapter_of_the_day(today).await.to_string()
            } else {
                picker
                    .verse_of_the_day(today)
                    .await
                    .ok_or_else(|| VerseError::NotFound("no verses loaded".to_string()))?
            };
            let result = catalog.execute(&reference, &QueryParams::new())?;
            print!(
                "{}",
                OutputFormatter::new(OutputFormat::Text).format_result(&result)?
            );
        }
        Commands::Shell => shell(&catalog).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Read queries line by line until EOF or `:quit`. A line may carry options
/// after `?`, e.g. `light?search_strategy=exact&search_apply_highlight=true`.
async fn shell(catalog: &Catalog) -> Result<()> {
    println!("{}", "Type a reference or search text; :metrics, :quit".dimmed());
    let formatter = OutputFormatter::new(OutputFormat::Text);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" | ":q" => break,
            ":metrics" => {
                print!("{}", catalog.metrics().gather());
                continue;
            }
            _ => {}
        }

        let (query, params) = split_params(line);
        match catalog.execute(query, &params) {
            Ok(result) => print!("{}", formatter.format_result(&result)?),
            Err(e) if e.is_user_error() => println!("{}", e.to_string().yellow()),
            Err(e) => {
                warn!("Query {query:?} failed: {e}");
                println!("{}", e.to_string().red());
            }
        }
    }
    Ok(())
}

fn split_params(line: &str) -> (&str, QueryParams) {
    match line.split_once('?') {
        Some((query, options)) => (
            query,
            url::form_urlencoded::parse(options.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (line, QueryParams::new()),
    }
}

fn setup_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });

    if let Some(log_path) = &cli.log {
        if let Some(parent_dir) = log_path.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                fs::create_dir_all(parent_dir)?;
            }
        }
        let log_file = fs::File::create(log_path)?;
        builder.target(Target::Pipe(Box::new(log_file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder
        .try_init()
        .map_err(|e| VerseError::Other(e.to_string()))?;
    Ok(())
}
