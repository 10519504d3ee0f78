//! Interactive REPL that plays the chat front-end.
//!
//! Launch with `gobble-bot repl`. `/start`, `/smash`, `/pass` and `/view`
//! behave like the chat commands; `/user <id>` switches who is swiping.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use gobble::Outcome;

use crate::session::{GobbleSessionManager, Presentation};
use crate::tools::ToolRegistry;

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/start", "Show a restaurant for the current user"),
    ("/smash", "Keep the restaurant on screen and show the next"),
    ("/pass", "Skip the restaurant on screen and show the next"),
    ("/view", "List every restaurant the current user kept"),
    ("/user", "Switch to another user id"),
    ("/status", "Show progress through the catalog"),
    ("/info", "Show catalog and store details"),
    ("/tools", "List JSON-RPC tools"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for command completion.
#[derive(Default)]
struct GobbleHelper;

impl Completer for GobbleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        if input.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| Pair {
                display: format!("{cmd:<16} {desc}"),
                replacement: format!("{cmd} "),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for GobbleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line) && *cmd != line)
            .map(|(cmd, _)| cmd[line.len()..].to_string())
    }
}

impl Highlighter for GobbleHelper {}
impl Validator for GobbleHelper {}
impl Helper for GobbleHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL against an open session.
pub fn run(mut session: GobbleSessionManager, mut user_id: i64) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mgobble-bot v{}\x1b[0m \x1b[90m\u{2014} {} restaurants loaded\x1b[0m",
        env!("CARGO_PKG_VERSION"),
        session.catalog().len()
    );
    eprintln!();
    eprintln!(
        "    Swiping as user \x1b[36m{user_id}\x1b[0m. Type \x1b[36m/start\x1b[0m to begin, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<GobbleHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(GobbleHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".gobble_bot_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mgobble>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "" | "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "start" => show(session.start(user_id)),
                    "smash" | "keep" => show(session.decide(user_id, None, Outcome::Keep)),
                    "pass" | "discard" => show(session.decide(user_id, None, Outcome::Discard)),
                    "view" | "history" => cmd_view(&mut session, user_id),
                    "user" => cmd_user(args, &mut user_id),
                    "status" => cmd_status(&mut session, user_id),
                    "info" => cmd_info(&session),
                    "tools" => cmd_tools(),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

/// Chat markup to terminal escapes.
fn to_terminal(text: &str) -> String {
    text.replace("<b>", "\x1b[1m")
        .replace("</b>", "\x1b[0m")
        .replace("<i>", "\x1b[3m")
        .replace("</i>", "\x1b[0m")
}

fn show(result: crate::types::McpResult<Presentation>) {
    match result {
        Ok(p) => {
            eprintln!();
            for line in to_terminal(&p.text).lines() {
                eprintln!("  {line}");
            }
            if !p.controls.is_empty() {
                let labels: Vec<String> = p
                    .controls
                    .iter()
                    .map(|c| format!("[{}] /{}", c.label, c.label.to_lowercase()))
                    .collect();
                eprintln!();
                eprintln!("  \x1b[36m{}\x1b[0m", labels.join("   "));
            }
            eprintln!();
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
}

fn cmd_view(session: &mut GobbleSessionManager, user_id: i64) {
    match session.history(user_id) {
        Ok(text) if text.is_empty() => eprintln!("  Nothing saved yet."),
        Ok(text) => {
            for line in to_terminal(&text).lines() {
                eprintln!("  {line}");
            }
            eprintln!();
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}

fn cmd_user(args: &str, user_id: &mut i64) {
    match args.parse::<i64>() {
        Ok(id) => {
            *user_id = id;
            eprintln!("  Now swiping as user {id}.");
        }
        Err(_) => eprintln!("  Usage: /user <integer id>"),
    }
}

fn cmd_status(session: &mut GobbleSessionManager, user_id: i64) {
    match session.status(user_id) {
        Ok(status) => {
            eprintln!();
            eprintln!("  User {}", status.user_id);
            eprintln!("    Saved:      {}/{}", status.saved, status.catalog_size);
            eprintln!("    Exhausted:  {}", status.exhausted);
            eprintln!("    Since:      {}", status.created_at);
            eprintln!();
        }
        Err(e) => eprintln!("  Error: {e}"),
    }
}

fn cmd_info(session: &GobbleSessionManager) {
    eprintln!();
    eprintln!("  Catalog:  {}", session.catalog_path().display());
    eprintln!("    Entries: {}", session.catalog().len());
    match session.store().user_count() {
        Ok(n) => eprintln!("  Users:    {n}"),
        Err(e) => eprintln!("  Users:    unavailable ({e})"),
    }
    eprintln!();
}

fn cmd_tools() {
    let tools = ToolRegistry::list_tools();
    eprintln!();
    eprintln!("  {} tools available:", tools.len());
    eprintln!();
    for tool in &tools {
        eprintln!(
            "    {:<20} {}",
            tool.name,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}
