//! Portfolio analysis console
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_BASE="https://api.openai.com/v1"
//! export OPENAI_API_KEY="sk-..."
//! export OPENAI_MODEL="gpt-4o-mini"
//! export SEARCH_API_KEY="tvly-..."   # optional, enables web search
//!
//! cargo run -p portfolio-cli -- portfolio
//! ```

mod console;

use agent_core::{Agent, ConversationThread, RunContext};
use agent_portfolio::{
    PortfolioConfig, PortfolioTools, financial_analysis_agent, openai_runtime, portfolio_request,
    portfolio_workflow,
};
use agent_runtime::AgentRuntime;
use clap::{Parser, Subcommand};
use console::{Prompt, interruptible, rule, write_relay, write_segments};
use std::io;
use std::time::Instant;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "portfolio-cli")]
#[command(about = "Financial analysis agents in the terminal", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Multi-turn chat with the financial analysis agent
    Chat,
    /// Analyze portfolios with the research, risk and advisor workflow
    Portfolio,
    /// Ask the financial analysis agent one question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app = agent_utils::AppConfig::from_env()?;
    agent_utils::init_tracing_with(app.log_format, "warn,agent_portfolio=info");

    let portfolio_config = PortfolioConfig::default().with_env_keys();
    if !portfolio_config.search_enabled() {
        info!("SEARCH_API_KEY not set, web search will report errors to the agents");
    }
    let tools = PortfolioTools::new(portfolio_config)?;
    let runtime = openai_runtime(&app, &tools)?;
    info!(command = ?args.command, model = %app.model.model, "Starting portfolio-cli");

    match args.command {
        Command::Chat => chat(&runtime, &tools).await,
        Command::Portfolio => portfolio(&runtime, &tools).await,
        Command::Ask { question } => ask(&runtime, &tools, &question.join(" ")).await,
    }
}

async fn chat(runtime: &AgentRuntime, tools: &PortfolioTools) -> anyhow::Result<()> {
    let agent = financial_analysis_agent(runtime, tools)?;
    let mut thread = ConversationThread::new();
    let mut prompt = Prompt::new();

    println!("=== Financial Analysis Agent ===");
    println!("Ask about stocks, sectors or markets. Prices and web search are available.");
    println!("Type '{}' to exit. Ctrl-C cancels the current answer.", console::QUIT);
    println!("{}", rule('='));
    println!();

    while let Some(line) = prompt.read("User > ").await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        print!("Assistant > ");
        let ctx = RunContext::new();
        let stream = agent.run_streaming(input.to_string(), Some(&mut thread), &ctx);
        let outcome = interruptible(&ctx, write_segments(&mut io::stdout(), stream)).await;

        match outcome {
            Ok(_) => println!("\n"),
            Err(e) if e.is_cancelled() => println!("\n[cancelled]\n"),
            Err(e) => {
                error!(error = %e, "Chat turn failed");
                println!("\nError: {e}\n");
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn portfolio(runtime: &AgentRuntime, tools: &PortfolioTools) -> anyhow::Result<()> {
    let workflow = portfolio_workflow(runtime, tools)?;
    let mut prompt = Prompt::new();

    println!("=== Portfolio Analyzer - Sequential Orchestration ===");
    println!("Research, risk assessment and investment advice, one agent after another.");
    println!("Enter stock symbols separated by commas (e.g., 'MSFT, AAPL, TSLA, NVDA')");
    println!("Type '{}' to exit. Ctrl-C cancels the current analysis.", console::QUIT);
    println!("{}", rule('='));
    println!();

    while let Some(line) = prompt.read("Enter portfolio > ").await? {
        let holdings = line.trim();
        if holdings.is_empty() {
            continue;
        }

        println!("\n{}", rule('='));
        println!("PORTFOLIO ANALYSIS - SEQUENTIAL ORCHESTRATION");
        println!("{}\n", rule('='));

        let started = Instant::now();
        let ctx = RunContext::new();
        let relay = workflow.relay(portfolio_request(holdings), &ctx);
        let outcome = interruptible(&ctx, write_relay(&mut io::stdout(), relay)).await;

        match outcome {
            Ok(()) => {
                println!("\n{}", rule('='));
                println!("✓ ANALYSIS COMPLETE - Duration: {}ms", started.elapsed().as_millis());
                println!("{}", rule('='));
            }
            Err(e) if e.is_cancelled() => println!("\nAnalysis cancelled."),
            Err(e) => {
                error!(error = %e, "Portfolio analysis failed");
                println!("\nError analyzing portfolio: {e}");
            }
        }
        println!();
    }

    println!("Thank you for using the Portfolio Analyzer!");
    Ok(())
}

async fn ask(
    runtime: &AgentRuntime,
    tools: &PortfolioTools,
    question: &str,
) -> anyhow::Result<()> {
    let agent = financial_analysis_agent(runtime, tools)?;
    let ctx = RunContext::new();

    let result = interruptible(&ctx, agent.run(question.to_string(), None, &ctx)).await?;
    println!("{}", result.text);
    Ok(())
}
