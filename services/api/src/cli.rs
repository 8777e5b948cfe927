use crate::demo::{run_demo, run_queue_report, DemoArgs, QueueReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use leadflow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Leadflow Routing Service",
    about = "Run and demonstrate the marketplace lead-routing engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the routing queue against seeded demo data
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
    /// Run an end-to-end CLI demo covering intake, assignment, and escalation
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// Render a point-in-time queue report with suggestions and SLA buckets
    Report(QueueReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Queue {
            command: QueueCommand::Report(args),
        } => run_queue_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
