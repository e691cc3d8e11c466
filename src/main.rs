//! Sui Transfer Agent CLI
//!
//! Command-line surface over the transfer pipeline and wallet panel.

use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sui_transfer_agent::audit::{AuditEntry, AuditLog};
use sui_transfer_agent::preview::parse_sui_amount;
use sui_transfer_agent::resolver::{looks_like_address, validate_address, NameResolver, RecipientToken};
use sui_transfer_agent::rpc::SuiRpcClient;
use sui_transfer_agent::wallet::{
    derive_address, KeyCustodian, KeyringStore, SecretStore, WalletRecord, WalletRegistry,
};
use sui_transfer_agent::{
    Config, Error, Result, TransferMode, TransferOutcome, TransferPipeline, TransferRequest,
};

#[derive(Parser)]
#[command(name = "sui-agent")]
#[command(about = "Keychain-custodied SUI transfer agent with dry-run previews")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview and execute a SUI transfer
    Transfer {
        /// Wallet alias
        wallet: String,

        /// Recipient: 0x address or SuiNS name (suffix optional)
        recipient: String,

        /// Amount in SUI, e.g. 0.5
        amount: String,

        /// Simulate and report only; never prompts, never touches keys
        #[arg(long)]
        preview: bool,

        /// Skip the interactive confirmation (bot mode)
        #[arg(long)]
        yes: bool,
    },

    /// Resolve a SuiNS name, or reverse-resolve an address
    Resolve {
        /// Name (suffix optional) or 0x address
        name: String,
    },

    /// Manage wallet aliases and stored keys
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// List registered wallets
    List,

    /// Store a private key in the platform keychain and register its address
    Add {
        /// Wallet alias, e.g. sui1
        alias: String,
    },

    /// Delete a wallet's key and registry entry
    Remove {
        alias: String,
    },

    /// Verify keychain access for a wallet (reports key length only)
    Test {
        alias: String,
    },

    /// Reset access control so the next access prompts again
    ResetAcl {
        alias: String,
    },

    /// Print a config snippet of registered wallets
    ExportConfig,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Transfer {
            wallet,
            recipient,
            amount,
            preview,
            yes,
        } => run_transfer(&config, wallet, recipient, amount, preview, yes).await,
        Commands::Resolve { name } => run_resolve(&config, name).await,
        Commands::Wallet { command } => run_wallet(&config, command).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_transfer(
    config: &Config,
    wallet: String,
    recipient: String,
    amount: String,
    preview: bool,
    yes: bool,
) -> Result<()> {
    let amount_mist = parse_sui_amount(&amount)?;
    let api = SuiRpcClient::new(&config.rpc_url)?;
    let registry = WalletRegistry::load(&config.registry_path)?;
    let custodian = KeyCustodian::new(KeyringStore::new(config.keychain_service.clone()));
    let pipeline = TransferPipeline::new(&api, &custodian, &registry, config);

    let request = TransferRequest {
        wallet,
        recipient: RecipientToken::new(recipient),
        amount_mist,
    };
    let audit = config.audit_log_path.as_ref().map(AuditLog::new);
    let mode_name = if preview { "preview" } else { "execute" };

    let mode = if preview {
        TransferMode::Preview
    } else {
        TransferMode::Execute { confirmed: yes }
    };

    let outcome = match pipeline.run(&request, mode).await {
        Ok(outcome) => outcome,
        Err(e) => {
            record_audit(&audit, &request, mode_name, |entry| {
                entry.outcome = "failed".to_string();
                entry.error = Some(e.to_string());
            });
            return Err(e);
        }
    };

    match outcome {
        TransferOutcome::Preview { resolved, report, .. } => {
            println!("{}", report);
            println!(
                "To execute: sui-agent transfer {} {} {} --yes",
                request.wallet, request.recipient, amount
            );
            record_audit(&audit, &request, mode_name, |entry| {
                entry.resolved_address = Some(resolved.address.clone());
                entry.outcome = "preview_only".to_string();
            });
            Ok(())
        }
        TransferOutcome::AwaitingConfirmation { resolved, report } => {
            println!("{}", report);
            if !confirm("Proceed with this transfer? (y/N): ").await? {
                println!("Cancelled.");
                record_audit(&audit, &request, mode_name, |entry| {
                    entry.resolved_address = Some(resolved.address.clone());
                    entry.outcome = "cancelled".to_string();
                });
                return Ok(());
            }
            // Rebuild from scratch rather than signing the previewed
            // bytes; the gas and balance snapshot may have gone stale
            let outcome = pipeline
                .run(&request, TransferMode::Execute { confirmed: true })
                .await;
            match outcome {
                Ok(TransferOutcome::Executed {
                    resolved,
                    summary,
                    report,
                }) => finish_execution(&audit, &request, mode_name, resolved.address, summary, report),
                Ok(_) => Err(Error::Wallet(
                    "confirmed transfer did not reach execution".to_string(),
                )),
                Err(e) => {
                    record_audit(&audit, &request, mode_name, |entry| {
                        entry.outcome = "failed".to_string();
                        entry.error = Some(e.to_string());
                    });
                    Err(e)
                }
            }
        }
        TransferOutcome::Executed {
            resolved,
            summary,
            report,
        } => finish_execution(&audit, &request, mode_name, resolved.address, summary, report),
    }
}

fn finish_execution(
    audit: &Option<AuditLog>,
    request: &TransferRequest,
    mode_name: &'static str,
    resolved_address: String,
    summary: sui_transfer_agent::transfer::ExecutionSummary,
    report: String,
) -> Result<()> {
    println!("{}", report);
    let success = summary.is_success();
    record_audit(audit, request, mode_name, |entry| {
        entry.resolved_address = Some(resolved_address.clone());
        entry.outcome = if success { "success" } else { "failed" }.to_string();
        entry.digest = Some(summary.digest.clone());
        if let Some(error) = summary.status_error() {
            entry.error = Some(error.to_string());
        }
    });
    if success {
        Ok(())
    } else {
        Err(Error::Broadcast(
            summary
                .status_error()
                .unwrap_or("transaction failed on-chain")
                .to_string(),
        ))
    }
}

fn record_audit(
    audit: &Option<AuditLog>,
    request: &TransferRequest,
    mode: &'static str,
    fill: impl FnOnce(&mut AuditEntry),
) {
    if let Some(log) = audit {
        let mut entry = AuditEntry::new(
            &request.wallet,
            request.recipient.as_str(),
            request.amount_mist,
            mode,
        );
        fill(&mut entry);
        log.record(&entry);
    }
}

async fn run_resolve(config: &Config, name: String) -> Result<()> {
    let api = SuiRpcClient::new(&config.rpc_url)?;
    let resolver = NameResolver::new(&api);

    if looks_like_address(&name) {
        validate_address(&name).map_err(Error::Resolution)?;
        match resolver.reverse(&name).await {
            Some(primary) => println!("{} -> {}", name, primary),
            None => println!("{} has no name bound", name),
        }
        return Ok(());
    }

    let resolved = resolver.resolve(&RecipientToken::new(name)).await?;
    match &resolved.domain {
        Some(domain) => println!("{} -> {}", domain, resolved.address),
        None => println!("{}", resolved.address),
    }
    Ok(())
}

async fn run_wallet(config: &Config, command: WalletCommands) -> Result<()> {
    let store = KeyringStore::new(config.keychain_service.clone());
    let mut registry = WalletRegistry::load(&config.registry_path)?;

    match command {
        WalletCommands::List => {
            if registry.is_empty() {
                println!("No wallets registered yet.");
                println!("Use `sui-agent wallet add <alias>` to add one.");
                return Ok(());
            }
            println!("Registered wallets ({} total):", registry.len());
            for (i, record) in registry.iter().enumerate() {
                println!("  {}. [{}] {}", i + 1, record.chain.to_uppercase(), record.alias);
                println!("     address: {}", record.address);
            }
            Ok(())
        }
        WalletCommands::Add { alias } => {
            if store.exists(&alias)?
                && !confirm(&format!("'{}' already exists. Overwrite? (y/N): ", alias)).await?
            {
                println!("Cancelled.");
                return Ok(());
            }
            let secret = read_secret_line(
                "Paste private key (suiprivkey1... or 64 hex digits); input is not hidden: ",
            )
            .await?;
            let address =
                derive_address(secret.expose_secret()).map_err(|e| Error::Wallet(e.to_string()))?;
            println!("Derived address: {}", address);

            store.put(&alias, secret)?;
            registry.upsert(WalletRecord {
                alias: alias.clone(),
                chain: "sui".to_string(),
                address,
            });
            registry.save(&config.registry_path)?;
            println!(
                "Wallet [{}] stored in the platform keychain; access will prompt for authorization.",
                alias
            );
            Ok(())
        }
        WalletCommands::Remove { alias } => {
            if registry.find(&alias).is_none() {
                return Err(Error::Wallet(format!("wallet '{}' not found", alias)));
            }
            if !confirm(&format!("Delete wallet '{}' and its stored key? (y/N): ", alias)).await? {
                println!("Cancelled.");
                return Ok(());
            }
            store.delete(&alias)?;
            registry.remove(&alias);
            registry.save(&config.registry_path)?;
            println!("Wallet [{}] deleted.", alias);
            Ok(())
        }
        WalletCommands::Test { alias } => {
            println!("Testing keychain access for '{}'...", alias);
            if let Some(record) = registry.find(&alias) {
                println!("  address: {}", record.address);
            }
            let secret = store.get(&alias)?;
            println!(
                "  keychain access OK (key length: {})",
                secret.expose_secret().len()
            );
            Ok(())
        }
        WalletCommands::ResetAcl { alias } => {
            println!("Resetting access control for '{}'.", alias);
            println!("This drops any trusted-application grant; the next access will prompt again.");
            store.reset_access_control(&alias)?;
            println!("Access control for '{}' has been reset.", alias);
            Ok(())
        }
        WalletCommands::ExportConfig => {
            if registry.is_empty() {
                println!("No wallets to export.");
                return Ok(());
            }
            println!("# sui-transfer-agent wallet config snippet");
            println!("wallet:");
            println!("  service_id: {}", config.keychain_service);
            if let Some(first) = registry.iter().next() {
                println!("  default: {}", first.alias);
            }
            println!("  accounts:");
            for record in registry.iter() {
                println!("    - alias: {}", record.alias);
                println!("      chain: {}", record.chain);
                println!("      address: {}", record.address);
            }
            Ok(())
        }
    }
}

/// Prompt on stdout and read one line from stdin. Stdin blocks until the
/// user answers, so the read runs on the blocking pool.
async fn confirm(prompt: &str) -> Result<bool> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || -> Result<bool> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

async fn read_secret_line(prompt: &str) -> Result<SecretString> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || -> Result<SecretString> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let secret = SecretString::from(line.trim().to_string());
        line.clear(); // best effort; the trimmed copy is the secret now
        if secret.expose_secret().is_empty() {
            return Err(Error::InvalidArgument(
                "private key cannot be empty".to_string(),
            ));
        }
        Ok(secret)
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}
