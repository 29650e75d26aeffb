use clap::Parser;
use eyre::eyre;
use std::path::PathBuf;
use vault_env::VaultEnv;
use vault_env_config::{ConfigLoader, RuntimeOptions};
use vault_env_supervisor::CommandSpec;
use vault_env_utils::tracing::{LogFormat, Verbosity};

#[derive(Parser)]
#[command(name = "vault-env")]
#[command(about = "Run a command with secrets from Vault injected into its environment", long_about = None)]
#[command(version)]
#[command(after_help = "Examples:\n  \
    vault-env --verbosity debug -c ./config.json command_for_run\n  \
    vault-env -c ./config.json -- bash -c \"echo Hello, Bash!\"")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "VAULT_ENV_CONFIG")]
    config: PathBuf,

    /// Log level: error, warn, info, debug or trace
    #[arg(short, long)]
    verbosity: Option<Verbosity>,

    /// Log format: json or text
    #[arg(short = 'f', long)]
    log_format: Option<LogFormat>,

    /// Re-fetch secrets on lease expiry and restart the command on change
    #[arg(long)]
    watch: bool,

    /// Do not contact Vault; run the command without secrets
    #[arg(long)]
    dummy: bool,

    /// Command to run, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let loader = ConfigLoader::new()
        .file(&cli.config)
        .runtime(RuntimeOptions {
            verbosity: cli.verbosity,
            log_format: cli.log_format,
            watch: cli.watch,
            dummy: cli.dummy,
        });

    let file = loader.read()?;
    let (verbosity, log_format) = loader.logging(&file);
    vault_env_utils::tracing::init(verbosity, log_format)
        .map_err(|e| eyre!("failed to initialize logging: {e}"))?;

    tracing::info!(target: "vault_env", "version {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(target: "vault_env", "verbosity \"{verbosity}\"");

    let code = match run(loader, file, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(target: "vault_env", "{e}");
            return Err(e);
        }
    };

    tracing::info!(target: "vault_env", "exiting with code={code}");
    std::process::exit(code)
}

async fn run(
    loader: ConfigLoader,
    file: vault_env_config::ConfigFile,
    command: Vec<String>,
) -> eyre::Result<i32> {
    let config = loader.resolve(file)?;

    let mut command = command.into_iter();
    let program = command
        .next()
        .ok_or_else(|| eyre!("no command given"))?;

    let vault_env = VaultEnv::new(config, CommandSpec::new(program, command.collect()))?;
    Ok(vault_env.run().await?)
}
