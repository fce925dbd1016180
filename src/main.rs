use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "ethereum-rust")]
#[command(about = "A complete Ethereum implementation in Rust", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Ethereum node
    Run {
        /// Network to connect to
        #[arg(short, long, default_value = "mainnet")]
        network: String,
        
        /// Data directory
        #[arg(short, long, default_value = "./data")]
        datadir: String,
        
        /// HTTP RPC port
        #[arg(long, default_value = "8545")]
        http_port: u16,
        
        /// WebSocket RPC port
        #[arg(long, default_value = "8546")]
        ws_port: u16,
        
        /// P2P port
        #[arg(long, default_value = "30303")]
        p2p_port: u16,
    },
    
    /// Initialize a new genesis block
    Init {
        /// Path to genesis configuration file
        #[arg(short, long)]
        genesis: String,
        
        /// Data directory
        #[arg(short, long, default_value = "./data")]
        datadir: String,
    },
    
    /// Account management commands
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Create a new account
    New {
        /// Keystore directory
        #[arg(short, long, default_value = "./keystore")]
        keystore: String,
    },
    
    /// List existing accounts
    List {
        /// Keystore directory
        #[arg(short, long, default_value = "./keystore")]
        keystore: String,
    },
    
    /// Import a private key
    Import {
        /// Private key file
        #[arg(short, long)]
        key: String,
        
        /// Keystore directory
        #[arg(short, long, default_value = "./keystore")]
        keystore: String,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Inspect the database
    Inspect {
        /// Data directory
        #[arg(short, long, default_value = "./data")]
        datadir: String,
    },
    
    /// Prune the database
    Prune {
        /// Data directory
        #[arg(short, long, default_value = "./data")]
        datadir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
    
    match cli.command {
        Commands::Run {
            network,
            datadir,
            http_port,
            ws_port,
            p2p_port,
        } => {
            info!(
                "Starting Ethereum Rust node on {} network",
                network
            );
            info!("Data directory: {}", datadir);
            info!("HTTP RPC port: {}", http_port);
            info!("WebSocket RPC port: {}", ws_port);
            info!("P2P port: {}", p2p_port);
            
            // TODO: Implement node startup
            info!("Node implementation pending...");
        }
        
        Commands::Init { genesis, datadir } => {
            info!("Initializing genesis block from {}", genesis);
            info!("Data directory: {}", datadir);
            
            // TODO: Implement genesis initialization
            info!("Genesis initialization pending...");
        }
        
        Commands::Account { command } => match command {
            AccountCommands::New { keystore } => {
                info!("Creating new account in keystore: {}", keystore);
                // TODO: Implement account creation
                info!("Account creation pending...");
            }
            
            AccountCommands::List { keystore } => {
                info!("Listing accounts in keystore: {}", keystore);
                // TODO: Implement account listing
                info!("Account listing pending...");
            }
            
            AccountCommands::Import { key, keystore } => {
                info!("Importing key from {} to keystore: {}", key, keystore);
                // TODO: Implement key import
                info!("Key import pending...");
            }
        },
        
        Commands::Db { command } => match command {
            DbCommands::Inspect { datadir } => {
                info!("Inspecting database at: {}", datadir);
                // TODO: Implement database inspection
                info!("Database inspection pending...");
            }
            
            DbCommands::Prune { datadir } => {
                info!("Pruning database at: {}", datadir);
                // TODO: Implement database pruning
                info!("Database pruning pending...");
            }
        },
    }
    
    Ok(())
}
