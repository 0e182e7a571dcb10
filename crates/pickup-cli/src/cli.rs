use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pickup",
    about = "Pickup integrity engine: commitments, Merkle batches, and scan codes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute commitment hashes
    Hash(HashArgs),
    /// Seal a batch of pickup events or prove membership in one
    Batch(BatchArgs),
    /// Check Merkle inclusion proofs
    Proof(ProofArgs),
    /// Generate a signing key and its address
    Keygen,
    /// Create and sign a guardian authorization
    SignAuthorization(SignAuthorizationArgs),
    /// Issue scan codes
    Token(TokenArgs),
    /// Run the full authorize, scan, batch, anchor, verify flow in memory
    Demo,
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct HashArgs {
    #[command(subcommand)]
    pub target: HashTarget,
}

#[derive(Subcommand)]
pub enum HashTarget {
    /// Pseudonymize a raw student identifier
    Student { student_id: String },
    /// Hash an authorization payload (JSON file, `-` for stdin)
    Authorization { input: String },
    /// Hash a pickup-event payload (JSON file, `-` for stdin)
    Event { input: String },
}

#[derive(Args)]
pub struct BatchArgs {
    #[command(subcommand)]
    pub action: BatchAction,
}

#[derive(Subcommand)]
pub enum BatchAction {
    /// Seal a JSON array of pickup events and print the batch payload
    Root {
        input: String,
        #[arg(long, default_value = "1")]
        batch_number: u64,
        #[arg(long, default_value = "")]
        pointer: String,
    },
    /// Print the inclusion proof for the event at `index`
    Proof {
        input: String,
        #[arg(long)]
        index: usize,
        #[arg(long, default_value = "1")]
        batch_number: u64,
    },
}

#[derive(Args)]
pub struct ProofArgs {
    #[command(subcommand)]
    pub action: ProofAction,
}

#[derive(Subcommand)]
pub enum ProofAction {
    /// Verify a batch proof for an event against a Merkle root
    Verify {
        /// Batch proof JSON file
        #[arg(long)]
        proof: String,
        /// Pickup-event JSON file
        #[arg(long)]
        event: String,
        #[arg(long)]
        root: String,
    },
}

#[derive(Args)]
pub struct SignAuthorizationArgs {
    /// Guardian private key (hex); falls back to `PICKUP_GUARDIAN_KEY`
    #[arg(long)]
    pub key: Option<String>,
    #[arg(long)]
    pub student_id: String,
    #[arg(long)]
    pub pickup: String,
    /// Unix seconds; defaults to now
    #[arg(long)]
    pub start: Option<u64>,
    /// Unix seconds; defaults to one day after start
    #[arg(long)]
    pub end: Option<u64>,
}

#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Issue a scan code for a student and pickup person
    Issue {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        pickup: String,
        #[arg(long)]
        guardian: String,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
}
