//! Line-oriented chat loop

use crate::output::console::ConsoleFormatter;
use crate::progress::reporter::ProgressReporter;
use agentic_application::{
    ConversationMemory, NoProgress, Oracle, ProgressNotifier, RunQueryInput, RunQueryUseCase,
    ToolExecutorPort,
};
use agentic_domain::{ConversationId, OutputFormat, Query};
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Slash commands understood by the chat loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    /// Delete the conversation and start a fresh one
    Clear,
    History,
    Tools,
    Help,
    Quit,
}

impl ChatCommand {
    /// `None` for anything that is not a known command.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "/clear" => Some(ChatCommand::Clear),
            "/history" => Some(ChatCommand::History),
            "/tools" => Some(ChatCommand::Tools),
            "/help" | "/h" | "/?" => Some(ChatCommand::Help),
            "/quit" | "/exit" | "/q" => Some(ChatCommand::Quit),
            _ => None,
        }
    }
}

/// Interactive chat loop
pub struct ChatRepl<O, T, M>
where
    O: Oracle + 'static,
    T: ToolExecutorPort + 'static,
    M: ConversationMemory + 'static,
{
    use_case: RunQueryUseCase<O, T, M>,
    conversation_id: ConversationId,
    format: OutputFormat,
    show_progress: bool,
    cancellation: CancellationToken,
}

impl<O, T, M> ChatRepl<O, T, M>
where
    O: Oracle + 'static,
    T: ToolExecutorPort + 'static,
    M: ConversationMemory + 'static,
{
    pub fn new(use_case: RunQueryUseCase<O, T, M>) -> Self {
        Self {
            use_case,
            conversation_id: ConversationId::new(),
            format: OutputFormat::Text,
            show_progress: true,
            cancellation: CancellationToken::new(),
        }
    }

    /// Resume an existing conversation instead of starting a new one
    pub fn with_conversation(mut self, id: ConversationId) -> Self {
        self.conversation_id = id;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Stop waiting for input once the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    /// Run the chat loop on stdin
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.print_welcome();
        self.run_on(BufReader::new(tokio::io::stdin())).await
    }

    /// Run the chat loop on any line source; returns on `/quit` or EOF.
    pub async fn run_on<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> std::io::Result<()> {
        let mut lines = reader.lines();
        loop {
            eprint!("{} ", ">>>".cyan());
            let next = tokio::select! {
                line = lines.next_line() => line?,
                _ = self.cancellation.cancelled() => None,
            };
            let Some(line) = next else {
                println!("Bye!");
                return Ok(());
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('/') {
                match ChatCommand::parse(line) {
                    Some(ChatCommand::Quit) => {
                        println!("Bye!");
                        return Ok(());
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        println!("Unknown command: {}", line);
                        println!("Type /help for available commands");
                    }
                }
                continue;
            }

            if !self.process_query(line).await {
                return Ok(());
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "agentic - chat mode".bold());
        println!("{} {}", "Conversation:".dimmed(), self.conversation_id);
        println!();
        Self::print_help();
    }

    fn print_help() {
        println!("Commands:");
        println!("  /clear    - Forget this conversation and start a new one");
        println!("  /history  - Show the turns the assistant can see");
        println!("  /tools    - List the available tools");
        println!("  /quit     - Exit chat");
        println!();
    }

    async fn handle_command(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::Clear => {
                // A conversation that never received a query does not exist yet
                let _ = self.use_case.delete_conversation(self.conversation_id).await;
                self.conversation_id = ConversationId::new();
                println!("Started conversation {}", self.conversation_id);
            }
            ChatCommand::History => {
                match self.use_case.conversation_history(self.conversation_id).await {
                    Ok(turns) => println!("{}", ConsoleFormatter::format_history(&turns)),
                    Err(_) => println!("{}", ConsoleFormatter::format_history(&[])),
                }
            }
            ChatCommand::Tools => {
                for spec in self.use_case.registry().list_specs() {
                    println!("  {:<14} {}", spec.name.bold(), spec.description);
                }
            }
            ChatCommand::Help => Self::print_help(),
            ChatCommand::Quit => {}
        }
    }

    /// Returns `false` when the loop should stop (cancellation).
    async fn process_query(&self, line: &str) -> bool {
        let query = match Query::try_new(line) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                return true;
            }
        };
        let input = RunQueryInput::new(query).with_conversation(self.conversation_id);

        let reporter;
        let progress: &dyn ProgressNotifier = if self.show_progress {
            reporter = ProgressReporter::new();
            &reporter
        } else {
            &NoProgress
        };

        match self.use_case.execute_with_progress(input, progress).await {
            Ok(output) => {
                println!("{}", ConsoleFormatter::format(&output, self.format));
                println!();
                true
            }
            Err(e) => {
                eprintln!("{}", ConsoleFormatter::format_error(&e));
                !e.is_cancelled()
            }
        }
    }
}
