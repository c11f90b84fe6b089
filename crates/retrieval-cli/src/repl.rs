//! Interactive REPL: readline-based input, progress events to stdout
//! while a query is in flight, reserved line commands `exit`/`quit`,
//! `help`, `clear` (mirrors this codebase's `mira-chat` REPL shape,
//! minus multi-line block/continuation syntax the retrieval surface
//! doesn't need — queries here are single lines).

use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use retrieval_engine::{ProgressStream, Runtime};
use retrieval_types::{ProgressEvent, Query};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

const RESERVED_COMMANDS: &[&str] = &["exit", "quit", "help", "clear"];

struct CliHelper {
    hinter: HistoryHinter,
}

impl CliHelper {
    fn new() -> Self {
        Self { hinter: HistoryHinter::new() }
    }
}

impl Completer for CliHelper {
    type Candidate = String;
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for CliHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }
}

impl Validator for CliHelper {}
impl Helper for CliHelper {}

pub struct Repl {
    editor: Editor<CliHelper, DefaultHistory>,
    runtime: Arc<Runtime>,
    top_k: usize,
    enable_chat_search: bool,
    chat_channels: Vec<String>,
    history_path: std::path::PathBuf,
}

impl Repl {
    pub fn new(
        runtime: Arc<Runtime>,
        top_k: usize,
        enable_chat_search: bool,
        chat_channels: Vec<String>,
    ) -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(CliHelper::new()));

        let history_path = dirs::home_dir()
            .unwrap_or_default()
            .join(".retrieval-cli")
            .join("history");

        Ok(Self { editor, runtime, top_k, enable_chat_search, chat_channels, history_path })
    }

    fn load_history(&mut self) {
        if self.history_path.exists() {
            let _ = self.editor.load_history(&self.history_path);
        }
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = self.editor.save_history(&self.history_path);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.load_history();
        println!("Type a question (exit|quit to leave, help for commands)\n");

        loop {
            let line = match self.editor.readline(">>> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("error: {err:?}");
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let _ = self.editor.add_history_entry(&line);

            match trimmed.to_lowercase().as_str() {
                "exit" | "quit" => break,
                "help" => {
                    print_help();
                    continue;
                }
                "clear" => {
                    print!("\x1b[2J\x1b[H");
                    continue;
                }
                _ => {}
            }

            self.run_query(trimmed).await;
        }

        self.save_history();
        println!("Goodbye!");
        Ok(())
    }

    async fn run_query(&self, text: &str) {
        let query = match Query::builder(text)
            .top_k(self.top_k)
            .chat_search(self.enable_chat_search, self.chat_channels.clone())
            .build()
        {
            Ok(q) => q,
            Err(e) => {
                eprintln!("invalid query: {}", e.to_user_string());
                return;
            }
        };

        let progress = ProgressStream::new();
        let mut events = progress.subscribe();
        let watcher = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                print_progress(&event);
            }
        });

        let result = self.runtime.orchestrator.handle(&query, &progress).await;
        // Dropping `progress` closes its broadcast sender, which is the
        // watcher task's own exit signal once it's drained every
        // already-published event.
        drop(progress);
        let _ = watcher.await;

        match result {
            Ok(response) => {
                println!("\n{}\n", response.answer);
            }
            Err(e) => {
                eprintln!("error: {}", e.to_user_string());
            }
        }
    }
}

fn print_progress(event: &ProgressEvent) {
    let line = match event {
        ProgressEvent::QueryPlanned { queries } => format!("planned queries: {}", queries.join(", ")),
        ProgressEvent::SearchStarted => "searching...".to_string(),
        ProgressEvent::FusionComplete { total, method } => format!("found {total} results ({method})"),
        ProgressEvent::IterationStarted { index, max } => format!("chat refinement {}/{}", index + 1, max),
        ProgressEvent::IterationFinished { index, max, matches } => {
            format!("chat refinement {}/{} done, {matches} matches", index + 1, max)
        }
        ProgressEvent::ChatSearchComplete { total, is_sufficient } => {
            format!("chat search done: {total} matches, sufficient={is_sufficient}")
        }
        ProgressEvent::LlmStarted => "composing answer...".to_string(),
        ProgressEvent::LlmFinished => "answer ready".to_string(),
        ProgressEvent::Error { message } => format!("error: {message}"),
    };
    println!("  [{}]", line);
}

fn print_help() {
    println!("reserved commands: {}", RESERVED_COMMANDS.join(", "));
    println!("anything else is sent as a search query");
}
