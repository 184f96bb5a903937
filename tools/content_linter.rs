/// Content Linter — validates locale tables against the chat menus.
///
/// Usage: content_linter <locale_dir|locale.ron> [--config <chat_config.ron>]
use rustc_hash::FxHashSet;
use std::path::Path;
use std::process;

use support_chat::core::config::ChatConfig;
use support_chat::core::content::LocaleTable;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: content_linter <locale_dir|locale.ron> [--config <chat_config.ron>]");
        process::exit(0);
    }

    let locale_path = Path::new(&args[1]);
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            i += 1;
            config_path = Some(args[i].clone());
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match ChatConfig::load_from_ron(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => ChatConfig::default(),
    };

    let mut table = LocaleTable::new();
    let loaded = if locale_path.is_file() {
        table.load_from_ron(locale_path).map(|code| vec![code])
    } else if locale_path.is_dir() {
        table.load_dir(locale_path)
    } else {
        eprintln!("ERROR: Path '{}' does not exist", locale_path.display());
        process::exit(1);
    };

    match loaded {
        Ok(codes) => println!("Loaded {} locale(s): {}", codes.len(), codes.join(", ")),
        Err(e) => {
            eprintln!("ERROR: Failed to load locale content: {}", e);
            process::exit(1);
        }
    }

    let (errors, warnings) = lint_content(&table, &config);

    println!("\n=== Content Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_content(table: &LocaleTable, config: &ChatConfig) -> (Vec<String>, Vec<String>) {
    let mut errors: Vec<String> = table
        .lint(&config.menus)
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut warnings = Vec::new();

    // Only an error when linting the full table; a single file may
    // legitimately omit the default locale.
    if table.len() > 1 && !table.contains(&config.default_locale) {
        errors.push(format!(
            "Default locale '{}' is not among the loaded locales",
            config.default_locale
        ));
    }

    let offered: FxHashSet<&str> = config.menus.actions().into_iter().collect();

    for code in table.codes() {
        let Some(content) = table.get(code) else {
            continue;
        };

        let mut unused_topics: Vec<&str> = content
            .knowledge
            .keys()
            .map(String::as_str)
            .filter(|topic| !offered.contains(topic))
            .collect();
        unused_topics.sort_unstable();
        for topic in unused_topics {
            warnings.push(format!(
                "[{}] topic '{}' is never offered by any menu",
                code, topic
            ));
        }

        let mut unused_labels: Vec<&str> = content
            .labels
            .keys()
            .map(String::as_str)
            .filter(|action| !offered.contains(action))
            .collect();
        unused_labels.sort_unstable();
        for action in unused_labels {
            warnings.push(format!("[{}] label '{}' is never shown", code, action));
        }

        if content.subtitle.trim().is_empty() {
            warnings.push(format!("[{}] header subtitle is empty", code));
        }
        if content.more_questions.trim().is_empty() {
            warnings.push(format!("[{}] 'more_questions' prompt is empty", code));
        }

        for (topic, entry) in &content.knowledge {
            if entry.body.matches("<li>").count() != entry.body.matches("</li>").count() {
                warnings.push(format!(
                    "[{}] topic '{}' has unbalanced <li> tags",
                    code, topic
                ));
            }
        }
    }

    (errors, warnings)
}
