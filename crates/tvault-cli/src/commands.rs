use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use tvault_sdk::pattern::write_pattern;
use tvault_sdk::{LocalTransport, Snapshot, VaultClient};
use tvault_trusted::{TrustedApp, TrustedConfig};
use tvault_types::ObjectId;

use crate::cli::*;
use crate::report;

/// Storage used when neither `--config` nor `--storage-root` is given.
const DEFAULT_STORAGE_ROOT: &str = ".tvault";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Store(args) => cmd_store(&cli, args),
        Command::Fetch(args) => cmd_fetch(&cli, args),
        Command::Delete(args) => cmd_delete(&cli, args),
        Command::Crypt(args) => cmd_crypt(&cli, args),
        Command::Gen(args) => cmd_gen(&cli, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<TrustedConfig> {
    let config = match &cli.config {
        Some(path) => TrustedConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TrustedConfig::default().with_storage_root(DEFAULT_STORAGE_ROOT),
    };
    Ok(match &cli.storage_root {
        Some(root) => config.with_storage_root(root),
        None => config,
    })
}

fn connect(cli: &Cli) -> anyhow::Result<VaultClient<LocalTransport>> {
    let app = TrustedApp::new(load_config(cli)?).context("opening object store")?;
    let client = VaultClient::new(LocalTransport::new(app.open_connection()));
    Ok(match cli.format {
        OutputFormat::Text => client.on_progress(|p| {
            eprint!("\r  {} {:>10.2} MiB", p.operation, p.bytes as f64 / (1024.0 * 1024.0));
            let _ = io::stderr().flush();
        }),
        OutputFormat::Json => client,
    })
}

fn end_progress(cli: &Cli) {
    if cli.format == OutputFormat::Text {
        eprintln!();
    }
}

/// Text ids as-is; `0x`-prefixed ids as hex bytes.
fn parse_id(raw: &str) -> anyhow::Result<ObjectId> {
    let id = match raw.strip_prefix("0x") {
        Some(hex) => ObjectId::from_hex(hex)?,
        None => ObjectId::try_from(raw)?,
    };
    Ok(id)
}

fn cmd_store(cli: &Cli, args: &StoreArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let file = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let mut client = connect(cli)?;

    let start = Snapshot::now();
    let written = client.write_stream(&id, BufReader::new(file));
    end_progress(cli);
    let bytes = written.with_context(|| format!("storing {id}"))?;
    report::transfer(cli.format, "store", &id, &start.finish(bytes))
}

fn cmd_fetch(cli: &Cli, args: &FetchArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let mut client = connect(cli)?;

    let start = Snapshot::now();
    let data = client.read(&id).with_context(|| format!("fetching {id}"))?;
    let measurement = start.finish(data.len() as u64);
    match &args.output {
        Some(path) => {
            fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
            report::transfer(cli.format, "fetch", &id, &measurement)
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn cmd_delete(cli: &Cli, args: &DeleteArgs) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    connect(cli)?
        .delete(&id)
        .with_context(|| format!("deleting {id}"))?;
    match cli.format {
        OutputFormat::Text => println!("{} Deleted {}", "✓".green().bold(), id.to_string().yellow()),
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": id.to_string() })),
    }
    Ok(())
}

fn cmd_crypt(cli: &Cli, args: &CryptArgs) -> anyhow::Result<()> {
    let input = &args.input;
    let plaintext_len = fs::metadata(input)
        .with_context(|| format!("reading {}", input.display()))?
        .len();
    let enc_path = sibling(input, args.out_dir.as_deref(), "enc")?;
    let dec_path = sibling(input, args.out_dir.as_deref(), "dec")?;
    let mut client = connect(cli)?;

    let start = Snapshot::now();
    let encrypted = {
        let source = BufReader::new(File::open(input)?);
        let mut sink = BufWriter::new(File::create(&enc_path)?);
        client.encrypt_stream(source, plaintext_len, &mut sink)
    };
    end_progress(cli);
    let encrypted = encrypted.context("encrypting")?;
    let enc_measurement = start.finish(encrypted.bytes_in);

    let start = Snapshot::now();
    let decrypted = {
        let source = BufReader::new(File::open(&enc_path)?);
        let mut sink = BufWriter::new(File::create(&dec_path)?);
        client.decrypt_stream(source, &mut sink)
    };
    end_progress(cli);
    let decrypted = decrypted.context("decrypting")?;
    let dec_measurement = start.finish(decrypted.bytes_out);

    let verified = files_equal(input, &dec_path)?;
    report::crypt(
        cli.format,
        &report::CryptReport {
            input: input.display().to_string(),
            encrypted_path: enc_path.display().to_string(),
            decrypted_path: dec_path.display().to_string(),
            encrypt: report::Phase { summary: encrypted, measurement: enc_measurement },
            decrypt: report::Phase { summary: decrypted, measurement: dec_measurement },
            verified,
        },
    )?;
    if !verified {
        bail!("decrypted output differs from {}", input.display());
    }
    Ok(())
}

fn cmd_gen(cli: &Cli, args: &GenArgs) -> anyhow::Result<()> {
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut out = BufWriter::new(file);
    write_pattern(&mut out, args.size)?;
    match cli.format {
        OutputFormat::Text => println!(
            "{} Generated {} ({} bytes)",
            "✓".green().bold(),
            args.output.display().to_string().bold(),
            args.size
        ),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "generated": args.output.display().to_string(), "bytes": args.size })
        ),
    }
    Ok(())
}

/// `<dir>/<input file name>.<ext>`, where `dir` defaults to the input's directory.
fn sibling(input: &Path, out_dir: Option<&Path>, ext: &str) -> anyhow::Result<PathBuf> {
    let Some(name) = input.file_name() else {
        bail!("{} is not a file path", input.display());
    };
    let dir = out_dir
        .or_else(|| input.parent())
        .unwrap_or_else(|| Path::new("."));
    let mut name = name.to_os_string();
    name.push(".");
    name.push(ext);
    Ok(dir.join(name))
}

fn files_equal(a: &Path, b: &Path) -> anyhow::Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }
    let mut ra = BufReader::new(File::open(a)?);
    let mut rb = BufReader::new(File::open(b)?);
    let mut ba = vec![0u8; 64 * 1024];
    let mut bb = vec![0u8; 64 * 1024];
    loop {
        let na = tvault_sdk::chunker::read_full(&mut ra, &mut ba)?;
        let nb = tvault_sdk::chunker::read_full(&mut rb, &mut bb)?;
        if na != nb || ba[..na] != bb[..nb] {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
    }
}
