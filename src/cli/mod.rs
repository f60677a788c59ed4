use clap::{Parser, Subcommand};

mod serve;

#[derive(Debug, Parser)]
#[command(name = "sales-response-engine")]
#[command(about = "Low-latency sales response engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve => serve::run().await,
        }
    }
}
