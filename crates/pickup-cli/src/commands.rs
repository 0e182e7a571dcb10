use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, ensure, Context};
use colored::Colorize;
use pickup_anchor::{AnchorClient, ContractStats, InMemoryLedger};
use pickup_batch::{BatchAllocator, BatchBuilder, BatchConfig, BatchProof, SealedBatch};
use pickup_crypto::{
    authorization_hash, authorization_signing_message, pickup_event_hash, student_hash, SigningKey,
};
use pickup_token::{InMemoryTokenStore, ScanCodeService, TokenConfig};
use pickup_types::{
    unix_now, Address, AuthorizationData, Digest, HexBytes, MerkleBatchData, PickupEventData,
};
use pickup_verify::{VerificationEngine, Verdict, AUTHORIZATION_WINDOW_SECS};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::*;
use crate::config::EngineConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = EngineConfig::load(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Hash(args) => cmd_hash(args.target, format),
        Command::Batch(args) => cmd_batch(args.action, &config.batch, format),
        Command::Proof(args) => cmd_proof(args.action, format),
        Command::Keygen => cmd_keygen(format),
        Command::SignAuthorization(args) => cmd_sign_authorization(args, format),
        Command::Token(args) => cmd_token(args.action, &config.token, format),
        Command::Demo => cmd_demo(&config, format),
        Command::Config(args) => cmd_config(args.action, &config, format),
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn fmt_time(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn cmd_hash(target: HashTarget, format: OutputFormat) -> anyhow::Result<()> {
    let (label, hash) = match target {
        HashTarget::Student { student_id } => ("student", student_hash(&student_id)),
        HashTarget::Authorization { input } => {
            let auth = AuthorizationData::from_json(&read_input(&input)?)?;
            ("authorization", authorization_hash(&auth))
        }
        HashTarget::Event { input } => {
            let event = PickupEventData::from_json(&read_input(&input)?)?;
            ("event", pickup_event_hash(&event))
        }
    };
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "kind": label, "hash": hash })),
        OutputFormat::Text => {
            println!("{} {}", format!("{label}:").dimmed(), hash.to_string().cyan());
            Ok(())
        }
    }
}

pub(crate) fn load_events(text: &str) -> anyhow::Result<Vec<PickupEventData>> {
    let events: Vec<PickupEventData> =
        serde_json::from_str(text).context("expected a JSON array of pickup events")?;
    for (i, event) in events.iter().enumerate() {
        event
            .validate()
            .with_context(|| format!("event #{i} is invalid"))?;
    }
    Ok(events)
}

pub(crate) fn seal_events(
    events: Vec<PickupEventData>,
    config: &BatchConfig,
    batch_number: u64,
    timestamp: u64,
    pointer: &str,
) -> anyhow::Result<SealedBatch> {
    ensure!(batch_number >= 1, "batch numbers start at 1");
    let mut builder = BatchBuilder::new(config.clone());
    for event in events {
        builder.push(event)?;
    }
    let allocator = BatchAllocator::resume_after(batch_number - 1);
    Ok(builder.seal(&allocator, timestamp, pointer)?)
}

fn cmd_batch(action: BatchAction, config: &BatchConfig, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        BatchAction::Root {
            input,
            batch_number,
            pointer,
        } => {
            let events = load_events(&read_input(&input)?)?;
            let sealed = seal_events(events, config, batch_number, unix_now(), &pointer)?;
            print_batch(sealed.data(), format)
        }
        BatchAction::Proof {
            input,
            index,
            batch_number,
        } => {
            let events = load_events(&read_input(&input)?)?;
            let event = events
                .get(index)
                .cloned()
                .with_context(|| format!("no event at index {index} ({} events)", events.len()))?;
            let sealed = seal_events(events, config, batch_number, unix_now(), "")?;
            let proof = sealed.proof_for_event(&event)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "merkleRoot": sealed.root(),
                    "proof": proof,
                })),
                OutputFormat::Text => {
                    println!("Root:  {}", sealed.root().to_string().cyan());
                    println!("Leaf:  {}", proof.leaf.to_string().yellow());
                    for (depth, sibling) in proof.siblings.iter().enumerate() {
                        println!("  [{depth}] {sibling}");
                    }
                    Ok(())
                }
            }
        }
    }
}

fn print_batch(batch: &MerkleBatchData, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(batch),
        OutputFormat::Text => {
            println!("{} Batch #{}", "✓".green().bold(), batch.batch_number);
            println!("  Root:    {}", batch.merkle_root.to_string().cyan());
            println!("  Events:  {}", batch.event_count);
            println!("  Sealed:  {}", fmt_time(batch.timestamp));
            if !batch.external_data_pointer.is_empty() {
                println!("  Data:    {}", batch.external_data_pointer.blue());
            }
            Ok(())
        }
    }
}

fn cmd_proof(action: ProofAction, format: OutputFormat) -> anyhow::Result<()> {
    let ProofAction::Verify { proof, event, root } = action;
    let proof: BatchProof =
        serde_json::from_str(&read_input(&proof)?).context("malformed batch proof")?;
    let event = PickupEventData::from_json(&read_input(&event)?)?;
    let root = Digest::from_hex(&root)?;

    let valid = proof.verify_event(&event, &root);
    if format == OutputFormat::Json {
        print_json(&serde_json::json!({ "valid": valid, "batchNumber": proof.batch_number }))?;
    }
    if !valid {
        bail!("event is not included under root {root}");
    }
    if format == OutputFormat::Text {
        println!(
            "{} Event included in batch #{} under {}",
            "✓".green().bold(),
            proof.batch_number,
            root.short_hex().cyan()
        );
    }
    Ok(())
}

fn cmd_keygen(format: OutputFormat) -> anyhow::Result<()> {
    let key = SigningKey::generate();
    let secret = HexBytes::new(key.to_bytes().to_vec()).to_hex();
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "address": key.address(),
            "privateKey": secret,
        })),
        OutputFormat::Text => {
            println!("Address:     {}", key.address().to_string().green());
            println!("Private key: {}", secret);
            println!("{}", "Keep the private key secret.".yellow());
            Ok(())
        }
    }
}

/// Build an authorization for `student_id` and sign it as `guardian`.
pub(crate) fn sign_authorization(
    guardian: &SigningKey,
    student_id: &str,
    pickup: Address,
    start_time: u64,
    end_time: u64,
) -> anyhow::Result<AuthorizationData> {
    let mut auth = AuthorizationData {
        guardian: guardian.address(),
        pickup,
        student_hash: student_hash(student_id),
        start_time,
        end_time,
        signature: HexBytes::new(vec![]),
    };
    let signature = guardian.sign_message(&authorization_signing_message(&auth))?;
    auth.signature = HexBytes::new(signature.to_vec());
    auth.validate()?;
    Ok(auth)
}

fn cmd_sign_authorization(args: SignAuthorizationArgs, format: OutputFormat) -> anyhow::Result<()> {
    let key = match args.key {
        Some(key) => key,
        None => std::env::var("PICKUP_GUARDIAN_KEY")
            .context("pass --key or set PICKUP_GUARDIAN_KEY")?,
    };
    let guardian = SigningKey::from_hex(&key).context("invalid guardian key")?;
    let pickup = Address::parse(&args.pickup)?;
    let start = args.start.unwrap_or_else(unix_now);
    let end = args
        .end
        .unwrap_or_else(|| start.saturating_add(AUTHORIZATION_WINDOW_SECS));

    let auth = sign_authorization(&guardian, &args.student_id, pickup, start, end)?;
    match format {
        OutputFormat::Json => print_json(&auth),
        OutputFormat::Text => {
            println!("{} Authorization signed", "✓".green().bold());
            println!("  Guardian: {}", auth.guardian);
            println!("  Pickup:   {}", auth.pickup);
            println!("  Valid:    {} → {}", fmt_time(auth.start_time), fmt_time(auth.end_time));
            println!("  Hash:     {}", authorization_hash(&auth).to_string().cyan());
            println!("{}", serde_json::to_string(&auth)?);
            Ok(())
        }
    }
}

fn cmd_token(action: TokenAction, config: &TokenConfig, format: OutputFormat) -> anyhow::Result<()> {
    let TokenAction::Issue {
        student_id,
        pickup,
        guardian,
    } = action;
    let service = ScanCodeService::new(config.clone(), Arc::new(InMemoryTokenStore::new()))
        .context("set [token].secret in the config file or PICKUP_TOKEN_SECRET")?;
    let (token, code) = service.issue(
        &student_id,
        Address::parse(&pickup)?,
        Address::parse(&guardian)?,
        unix_now(),
    )?;
    let scan_code_hash = service.scan_code_hash(&token);
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "scanCode": code.to_wire(),
            "scanCodeHash": scan_code_hash,
            "token": token,
        })),
        OutputFormat::Text => {
            println!("{} Scan code issued", "✓".green().bold());
            println!("  Code:    {}", code.to_wire().yellow());
            println!("  Expires: {}", fmt_time(token.expires_at));
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DemoReport {
    pub guardian: Address,
    pub authorization_hash: Digest,
    pub authorization_valid: bool,
    pub scan_codes: Vec<String>,
    pub replay_rejected: bool,
    pub batch: MerkleBatchData,
    pub anchor_tx: Option<Digest>,
    pub pickup_valid: bool,
    pub batch_valid: bool,
    pub stats: ContractStats,
}

/// The whole lifecycle against an in-memory ledger.
pub(crate) async fn run_demo(config: &EngineConfig, now: u64) -> anyhow::Result<DemoReport> {
    let ledger = Arc::new(InMemoryLedger::new());
    let anchor = AnchorClient::new(ledger);
    let engine = VerificationEngine::new(anchor.clone(), config.verification.clone())
        .with_batch_config(config.batch.clone());

    let guardian = SigningKey::generate();
    let pickup_key = SigningKey::generate();
    let staff = SigningKey::generate().address();

    let auth = sign_authorization(
        &guardian,
        "S-1001",
        pickup_key.address(),
        now,
        now.saturating_add(config.verification.authorization_window),
    )?;
    let auth_hash = authorization_hash(&auth);
    if !anchor.is_authorization_registered(auth_hash).await {
        if let Some(err) = anchor
            .create_authorization(auth_hash, auth.guardian)
            .await
            .error()
        {
            bail!("registering authorization failed: {err}");
        }
    }
    let authorization_valid = engine.verify_authorization(&auth, now).await.is_valid();
    debug!(authorization = %auth_hash.short_hex(), authorization_valid, "demo authorization");

    let mut token_config = config.token.clone();
    if token_config.secret.is_empty() {
        token_config.secret = HexBytes::new(SigningKey::generate().to_bytes().to_vec()).to_hex();
    }
    let tokens = ScanCodeService::new(token_config, Arc::new(InMemoryTokenStore::new()))?;

    let mut scan_codes = Vec::new();
    let mut events = Vec::new();
    let mut replay_rejected = true;
    for student in ["S-1001", "S-1002", "S-1003"] {
        let (token, code) = tokens.issue(student, pickup_key.address(), auth.guardian, now)?;
        let signature = pickup_key.sign_message(&tokens.scan_code_hash(&token))?;
        let consumed = tokens.confirm_with_signature(&code, signature.as_bytes(), now, now)?;
        replay_rejected &= tokens.consume(&code, now).is_err();

        let event = tokens.pickup_event(&consumed, staff, now);
        if let Some(err) = anchor
            .record_pickup_event(pickup_event_hash(&event), &event)
            .await
            .error()
        {
            bail!("recording pickup event failed: {err}");
        }
        debug!(student, token_id = %consumed.token_id, "demo pickup recorded");
        scan_codes.push(code.to_wire());
        events.push(event);
    }

    let first = events
        .first()
        .cloned()
        .context("demo produced no events")?;
    let allocator = BatchAllocator::new();
    let mut builder = BatchBuilder::new(config.batch.clone());
    for event in events {
        builder.push(event)?;
    }
    let mut sealed = builder.seal(&allocator, now, "memory://demo/batch-1")?;
    let anchored = anchor.anchor_batch(sealed.data()).await;
    match anchored.outcome.receipt() {
        Some(receipt) => sealed.set_block_number(receipt.block_number),
        None => bail!(
            "anchoring batch #{} failed: {:?}",
            anchored.batch_number,
            anchored.outcome.error()
        ),
    }

    info!(
        batch_number = sealed.batch_number(),
        events = sealed.events().len(),
        "demo batch anchored"
    );

    let proof = sealed.proof_for_event(&first)?;
    let pickup_valid = engine.verify_pickup_event(&first, &proof, now).await.is_valid();
    let batch_valid = engine
        .verify_batch(sealed.batch_number(), sealed.events())
        .await
        .is_valid();

    Ok(DemoReport {
        guardian: auth.guardian,
        authorization_hash: auth_hash,
        authorization_valid,
        scan_codes,
        replay_rejected,
        batch: sealed.data().clone(),
        anchor_tx: anchor.batch_transaction(sealed.batch_number()),
        pickup_valid,
        batch_valid,
        stats: anchor.get_contract_stats().await,
    })
}

fn cmd_demo(config: &EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(run_demo(config, unix_now()))?;
    if format == OutputFormat::Json {
        return print_json(&report);
    }

    let mark = |ok: bool| if ok { "✓".green().bold() } else { "✗".red().bold() };
    println!(
        "{} Authorization {} by {}",
        mark(report.authorization_valid),
        report.authorization_hash.short_hex().cyan(),
        report.guardian
    );
    for code in &report.scan_codes {
        println!("  scanned {}", code.dimmed());
    }
    println!("{} Replayed scan codes rejected", mark(report.replay_rejected));
    print_batch(&report.batch, format)?;
    if let Some(tx) = report.anchor_tx {
        println!(
            "  Tx:      {} (block {})",
            tx.short_hex().yellow(),
            report.batch.block_number
        );
    }
    println!("{} Pickup event proof verified", mark(report.pickup_valid));
    println!("{} Batch matches ledger root", mark(report.batch_valid));
    println!(
        "Ledger: {} authorizations, {} pickups, {} batches",
        report.stats.total_authorizations,
        report.stats.total_pickup_events,
        report.stats.total_batches
    );
    Ok(())
}

fn cmd_config(action: ConfigAction, config: &EngineConfig, format: OutputFormat) -> anyhow::Result<()> {
    let ConfigAction::Show = action;
    match format {
        OutputFormat::Json => print_json(config),
        OutputFormat::Text => {
            print!("{}", config.to_toml()?);
            let secret = if config.token.secret.is_empty() {
                "not set".red()
            } else {
                "set".green()
            };
            println!("# token secret: {secret}");
            Ok(())
        }
    }
}
