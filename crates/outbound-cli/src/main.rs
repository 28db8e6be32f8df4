use clap::{Parser, Subcommand, ValueEnum};
use outbound_core::Transport;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "outbound", version, about = "MCP server for an email-marketing REST API")]
struct Cli {
    /// Path to the configuration file. A missing file means defaults.
    #[arg(long, short, global = true, default_value = "outbound.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server.
    Serve {
        /// Upstream API key for the stdio transport. Over HTTP each request
        /// sends its own bearer token, so this flag is rejected there.
        #[arg(long)]
        api_key: Option<String>,

        /// Transport, overriding mcp.transport.
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,

        /// HTTP bind host, overriding mcp.host.
        #[arg(long)]
        host: Option<String>,

        /// HTTP port, overriding mcp.port.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect the tool catalog.
    Tools {
        #[command(subcommand)]
        cmd: ToolsCommand,
    },

    /// Validate the configuration file and print the effective settings.
    Check,
}

#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// List every tool.
    List {
        /// Also print each input schema.
        #[arg(long, short, default_value_t = false)]
        verbose: bool,
    },

    /// Show one tool in detail.
    Describe { tool_name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    Stdio,
    Http,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => Transport::Stdio,
            TransportArg::Http => Transport::Http,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdout belongs to the stdio transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve {
            api_key,
            transport,
            host,
            port,
        } => {
            let options = commands::serve::ServeOptions {
                config_path: cli.config,
                api_key,
                transport: transport.map(Transport::from),
                host,
                port,
            };
            commands::serve::run(options).await?
        }
        Command::Tools { cmd } => match cmd {
            ToolsCommand::List { verbose } => commands::tools::list(verbose)?,
            ToolsCommand::Describe { tool_name } => commands::tools::describe(&tool_name)?,
        },
        Command::Check => commands::check::run(&cli.config)?,
    }

    Ok(())
}
