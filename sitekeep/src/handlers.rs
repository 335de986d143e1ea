use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitekeep_core::capture::{SiteCaptureJob, execute_site_capture, generate_capture_report};
use sitekeep_core::data::Database;
use sitekeep_scanner::types::CaptureOptions;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Expands a user-supplied config location into (config dir, database file).
pub fn resolve_db_path(raw: &str) -> (PathBuf, PathBuf) {
    let expanded = shellexpand::tilde(raw);
    let dir = PathBuf::from(expanded.as_ref());
    let db_file = dir.join("sitekeep.db");
    (dir, db_file)
}

/// Loads rule text from an optional file. No file means the empty
/// (permit-all) rule set.
pub fn load_rules_file(path: Option<&PathBuf>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read rules file {}: {}", path.display(), e)),
        None => Ok(String::new()),
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

pub fn handle_init(args: &ArgMatches) {
    let raw_path = args.get_one::<String>("PATH").unwrap();
    let force = args.get_flag("force");
    let (config_dir, db_path) = resolve_db_path(raw_path);

    print_divider();
    println!("{}", "  SITEKEEP INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    if Database::exists(&db_path) && !force {
        println!("{}", "[WARNING]".yellow().bold());
        println!("An archive database already exists:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!("This operation will overwrite it.");

        let response = print_prompt("Do you want to continue? [y/N]:");
        if response != "y" && response != "yes" {
            println!("\nInitialization cancelled.");
            return;
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Creating configuration directory...");
    fs::create_dir_all(&config_dir).expect("Failed to create config directory");

    if Database::exists(&db_path) {
        spinner.set_message("Deleting existing database...");
        Database::drop(&db_path);
    }

    spinner.set_message(format!("Initializing database at: {}", db_path.display()));
    Database::new(&db_path).expect("Failed to create database");

    spinner.finish_with_message(format!(
        r#"
    ✓ sitekeep initialization complete!
    ✓ Config directory: {}
    ✓ Database: {}
    "#,
        config_dir.display(),
        db_path.display()
    ));
}

pub async fn handle_capture(args: &ArgMatches, quiet: bool) {
    let url = args.get_one::<Url>("url").unwrap();
    let depth = *args.get_one::<usize>("depth").unwrap();
    let threads = *args.get_one::<usize>("threads").unwrap();
    let delay_secs = *args.get_one::<f64>("delay").unwrap();
    let ignore_hashes = args.get_flag("ignore-hashes");
    let name = args.get_one::<String>("name").cloned();

    let include_rules = match load_rules_file(args.get_one::<PathBuf>("include-rules")) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };
    let exclude_rules = match load_rules_file(args.get_one::<PathBuf>("exclude-rules")) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    let (config_dir, db_path) = resolve_db_path(args.get_one::<String>("db").unwrap());
    if let Err(e) = fs::create_dir_all(&config_dir) {
        eprintln!(
            "✗ Failed to create config directory {}: {}",
            config_dir.display(),
            e
        );
        std::process::exit(1);
    }
    let db = match Database::new(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("✗ Failed to open database {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        println!("\nCapturing {}", url.host_str().unwrap_or("site"));
        println!("Workers: {}", threads);
        println!("Max depth: {}", depth);
        if delay_secs > 0.0 {
            println!("Politeness delay: {}s per worker", delay_secs);
        }
        println!();
    }

    let job = SiteCaptureJob {
        url: url.as_str().to_string(),
        name,
        capture: CaptureOptions {
            depth,
            threads,
            delay_secs,
            ignore_hashes,
            include_rules,
            exclude_rules,
        },
        show_progress: !quiet,
    };

    match execute_site_capture(db, job).await {
        Ok(summary) => {
            if !quiet {
                println!("\n✓ Site capture complete!\n");
            }
            print!("{}", generate_capture_report(&summary));
        }
        Err(e) => {
            eprintln!("✗ Site capture failed: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn handle_list(args: &ArgMatches) {
    let (_config_dir, db_path) = resolve_db_path(args.get_one::<String>("db").unwrap());

    if !Database::exists(&db_path) {
        eprintln!(
            "No archive database at {} (run `sitekeep init` first)",
            db_path.display()
        );
        std::process::exit(1);
    }

    let db = match Database::new(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("✗ Failed to open database {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    let folders = match db.site_folders() {
        Ok(folders) => folders,
        Err(e) => {
            eprintln!("✗ Failed to list captured sites: {}", e);
            std::process::exit(1);
        }
    };

    if folders.is_empty() {
        println!("No captured sites yet.");
        return;
    }

    print_divider();
    println!("{}", "  CAPTURED SITES".bright_white().bold());
    print_divider();

    for (id, name, pages) in folders {
        println!(
            "  {} {} {}",
            format!("[{}]", id).bright_black(),
            name.bright_white().bold(),
            format!("{} pages", pages).bright_black()
        );
    }
}
