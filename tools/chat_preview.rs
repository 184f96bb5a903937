/// Chat Preview — walk the support dialogue in a terminal.
///
/// Usage: chat_preview [--locale <code>] [--locales <dir>] [--config <file>]
///
/// Commands:
///   <n>            — pick the n-th menu entry
///   pick <action>  — pick an action by id
///   say <text>     — submit free text
///   lang <code>    — switch language
///   close / open   — close or reopen the widget
///   log            — print the whole message log
///   help           — list commands
///   quit           — exit
use chrono::{FixedOffset, Local, Offset};
use std::io::{self, BufRead, Write};
use std::process;
use std::thread;

use support_chat::core::engine::{ActionButton, DialogueEngine, Turn};
use support_chat::core::render::time_label;
use support_chat::schema::conversation::ConversationState;
use support_chat::schema::message::{Author, Message};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut locale = None;
    let mut locales_dir = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--locale" if i + 1 < args.len() => {
                i += 1;
                locale = Some(args[i].clone());
            }
            "--locales" if i + 1 < args.len() => {
                i += 1;
                locales_dir = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = DialogueEngine::builder();
    if let Some(dir) = locales_dir {
        builder = builder.locales_dir(dir);
    }
    if let Some(path) = config_path {
        builder = builder.config_file(path);
    }
    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let offset = Local::now().offset().fix();
    let requested = locale.unwrap_or_else(|| engine.default_locale().to_string());
    let (mut state, turn) = engine.start(&requested);

    let (header, subtitle) = engine.header(&state);
    println!("=== {} — {} ===", header, subtitle);
    println!("Locales: {}", engine.locales().codes().collect::<Vec<_>>().join(", "));
    println!("Type 'help' for commands.\n");

    let mut menu = show_turn(&engine, &state, &turn, &offset);
    let mut open = true;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("chat> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        if !open && !matches!(cmd, "open" | "quit" | "exit" | "q" | "help" | "log") {
            println!("(widget is closed, type 'open')");
            continue;
        }

        match cmd {
            "quit" | "exit" | "q" => {
                engine.cancel_pending(&mut state);
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "pick" => {
                if rest.is_empty() {
                    println!("Usage: pick <action>");
                    continue;
                }
                menu = pick(&engine, &mut state, rest, &offset).unwrap_or(menu);
            }
            "say" => {
                if rest.is_empty() {
                    println!("Usage: say <text>");
                    continue;
                }
                match engine.submit_free_text(&mut state, rest) {
                    Ok(turn) => {
                        if let Some(msg) = state.last_message() {
                            print_message(msg, &offset);
                        }
                        if let Some(turn) = wait_for_reply(&engine, &mut state, &turn) {
                            menu = show_turn(&engine, &state, &turn, &offset);
                        }
                    }
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "lang" => {
                let turn = engine.change_locale(&mut state, rest);
                if turn.is_empty() {
                    println!("(already using '{}')", state.locale());
                } else {
                    menu = show_turn(&engine, &state, &turn, &offset);
                }
            }
            "close" => {
                if engine.cancel_pending(&mut state) {
                    println!("(pending reply discarded)");
                }
                open = false;
                println!("(widget closed)");
            }
            "open" => {
                open = true;
                let turn = engine.resume(&state);
                menu = show_turn(&engine, &state, &turn, &offset);
            }
            "log" => {
                for msg in state.messages() {
                    print_message(msg, &offset);
                }
            }
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 && n <= menu.len() => {
                    let action = menu[n - 1].id.clone();
                    menu = pick(&engine, &mut state, &action, &offset).unwrap_or(menu);
                }
                _ => println!("Unknown command: {}. Type 'help'.", other),
            },
        }
    }
}

fn pick(
    engine: &DialogueEngine,
    state: &mut ConversationState,
    action: &str,
    offset: &FixedOffset,
) -> Option<Vec<ActionButton>> {
    match engine.select_action(state, action) {
        Ok(turn) => {
            let log = state.messages();
            if let Some(user) = log.iter().rev().find(|m| m.author == Author::User) {
                print_message(user, offset);
            }
            Some(show_turn(engine, state, &turn, offset))
        }
        Err(e) => {
            println!("ERROR: {}", e);
            None
        }
    }
}

/// Block until the scheduled reply is due, then deliver it.
fn wait_for_reply(
    engine: &DialogueEngine,
    state: &mut ConversationState,
    turn: &Turn,
) -> Option<Turn> {
    let pending = turn.scheduled?;
    print!("(typing");
    io::stdout().flush().ok();
    let wait = (pending.due_at - engine.now()).to_std().unwrap_or_default();
    thread::sleep(wait);
    println!("...)");
    engine.deliver_due(state)
}

fn show_turn(
    engine: &DialogueEngine,
    state: &ConversationState,
    turn: &Turn,
    offset: &FixedOffset,
) -> Vec<ActionButton> {
    if turn.reply.is_some() {
        if let Some(msg) = state.last_message() {
            print_message(msg, offset);
        }
    }
    for (n, action) in turn.actions.iter().enumerate() {
        println!("  [{}] {}", n + 1, action.label);
    }
    if turn.input_open {
        println!("  ({} — use 'say <text>')", engine.placeholder(state));
    }
    turn.actions.clone()
}

fn print_message(msg: &Message, offset: &FixedOffset) {
    let who = match msg.author {
        Author::Bot => "bot",
        Author::User => "you",
    };
    println!("[{}] {}:", time_label(&msg.timestamp, offset), who);
    for line in strip_tags(&msg.text).lines() {
        let line = line.trim();
        if !line.is_empty() {
            println!("    {}", line);
        }
    }
}

/// Drop HTML tags for terminal display; list items become bullets.
fn strip_tags(html: &str) -> String {
    let html = html.replace("<li>", "• ");
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn print_usage() {
    println!("Usage: chat_preview [--locale <code>] [--locales <dir>] [--config <file>]");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>            pick the n-th menu entry");
    println!("  pick <action>  pick an action by id (pricing, features, setup, trial, contact, custom)");
    println!("  say <text>     submit free text");
    println!("  lang <code>    switch language");
    println!("  close / open   close or reopen the widget");
    println!("  log            print the whole message log");
    println!("  quit           exit");
}
