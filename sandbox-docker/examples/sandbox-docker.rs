use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use sandbox_docker::{DockerCli, DockerSandbox, DockerSandboxConfig, Privilege};
use tracing::info;
use tracing_subscriber::fmt::time::FormatTime;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{mins:02}:{secs:02}:{millis:03}]")
    }
}

#[derive(Parser)]
#[command(name = "sandbox-docker")]
struct Cli {
    /// Docker CLI binary to drive
    #[arg(long, default_value = "docker")]
    docker: String,
    /// Invoke docker through `sudo -n`
    #[arg(long)]
    sudo: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify the docker binary and daemon are usable
    Check,
    /// Start a container, execute a command, then remove the container
    Exec {
        /// Shell command to execute inside the container
        cmd: String,
        /// YAML file with sandbox settings (flags below override it)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Image to run
        #[arg(long)]
        image: Option<String>,
        /// CPU quota in microseconds per 100ms period
        #[arg(long)]
        cpu_quota: Option<i64>,
        /// Memory limit with unit suffix (e.g. 512m)
        #[arg(long)]
        mem_limit: Option<String>,
        /// Network mode (e.g. none)
        #[arg(long)]
        network: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .init();

    let cli = Cli::parse();
    let privilege = if cli.sudo {
        Privilege::Sudo
    } else {
        Privilege::User
    };

    let result = match cli.command {
        Command::Check => run_check(&cli.docker, privilege).await,
        Command::Exec {
            cmd,
            config,
            image,
            cpu_quota,
            mem_limit,
            network,
        } => {
            let overrides = Overrides {
                image,
                cpu_quota,
                mem_limit,
                network,
            };
            run_exec(&cli.docker, privilege, &cmd, config, overrides).await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

struct Overrides {
    image: Option<String>,
    cpu_quota: Option<i64>,
    mem_limit: Option<String>,
    network: Option<String>,
}

async fn run_check(
    docker: &str,
    privilege: Privilege,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let client = DockerCli::connect(docker, privilege).await?;
    println!("docker: {}", client.binary());
    Ok(ExitCode::SUCCESS)
}

async fn run_exec(
    docker: &str,
    privilege: Privilege,
    cmd: &str,
    config_path: Option<PathBuf>,
    overrides: Overrides,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => sandbox_docker::config::load(&path).await?,
        None => DockerSandboxConfig::default(),
    };
    if let Some(image) = overrides.image {
        config.image = image;
    }
    if let Some(cpu_quota) = overrides.cpu_quota {
        config.cpu_quota = cpu_quota;
    }
    if let Some(mem_limit) = overrides.mem_limit {
        config.mem_limit = mem_limit;
    }
    if overrides.network.is_some() {
        config.network_mode = overrides.network;
    }

    let runtime = Arc::new(DockerCli::connect(docker, privilege).await?);
    let mut docker_sandbox = DockerSandbox::new(config, runtime)?;
    let effective = docker_sandbox.config();
    info!(
        image = %effective.image,
        cpu_quota = effective.cpu_quota,
        mem_limit = %effective.mem_limit,
        network = effective.network_mode.as_deref().unwrap_or("default"),
        "sandbox configured"
    );

    let cmd = cmd.to_owned();
    let result = sandbox::scoped(&mut docker_sandbox, |s| {
        Box::pin(async move { s.execute(&cmd).await })
    })
    .await?;

    println!("exit_code: {}", result.exit_code);
    println!("stdout: {}", result.stdout);
    println!("stderr: {}", result.stderr);

    Ok(if result.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
