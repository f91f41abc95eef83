//! Tangent - streaming chat agent with inline tool calls.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;

use tangent::agent::{Agent, ExchangeOutcome};
use tangent::backend::OpenAiBackend;
use tangent::cli::{self, Command};
use tangent::config::{self, Config};
use tangent::interrupt::{self, SigintCancelSource};
use tangent::output::{Output, SessionLog, TerminalOutput};
use tangent::tools::ToolRegistry;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = cli::parse_args();

    match args.command {
        Command::Init => {
            let path = config::init()?;
            println!("Created {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask { prompt, overrides } => {
            let config = overrides.apply(config::discover()?);
            let (mut agent, mut log) = build_agent(&config)?;
            let mut output = TerminalOutput::new();
            let outcome = agent.run_exchange(&prompt, &mut output, &mut log)?;
            Ok(exit_code_for(outcome))
        }
        Command::Chat { overrides } => {
            let config = overrides.apply(config::discover()?);
            let (mut agent, mut log) = build_agent(&config)?;
            chat_repl(&config, &mut agent, &mut log)
        }
    }
}

fn build_agent(config: &Config) -> Result<(Agent, SessionLog)> {
    interrupt::register_signal_handler()?;

    let backend = OpenAiBackend::new(
        &config.base_url,
        config.api_key()?,
        &config.model,
        config.temperature,
        config.max_tokens,
    );
    let agent = Agent::new(
        Box::new(backend),
        ToolRegistry::with_builtins(),
        Box::new(SigintCancelSource),
        config.max_tool_depth,
    );

    let log = if config.log_enabled {
        let log = SessionLog::create()?;
        if let Some(path) = log.path() {
            eprintln!("{}", format!("logging to {}", path.display()).dimmed());
        }
        log
    } else {
        SessionLog::disabled()
    };

    Ok((agent, log))
}

fn chat_repl(config: &Config, agent: &mut Agent, log: &mut SessionLog) -> Result<ExitCode> {
    println!(
        "{} {} ({})",
        "tangent".purple(),
        env!("CARGO_PKG_VERSION"),
        config.model
    );
    println!("{}", "Ctrl+C cancels a reply; 'exit' or Ctrl+D quits.".dimmed());

    let stdin = io::stdin();
    let mut output = TerminalOutput::new();
    loop {
        print!("{} ", ">".green());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match agent.run_exchange(line, &mut output, log)? {
            ExchangeOutcome::Done => {}
            ExchangeOutcome::Cancelled => {
                output.warn("cancelled");
            }
            ExchangeOutcome::DepthLimit => {}
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code_for(outcome: ExchangeOutcome) -> ExitCode {
    match outcome {
        ExchangeOutcome::Done => ExitCode::SUCCESS,
        ExchangeOutcome::Cancelled => ExitCode::from(130),
        ExchangeOutcome::DepthLimit => ExitCode::from(2),
    }
}
