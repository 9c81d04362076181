use colored::Colorize;
use serde::Serialize;
use tvault_sdk::{CipherSummary, Measurement};
use tvault_types::ObjectId;

use crate::cli::OutputFormat;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Serialize)]
struct TransferReport<'a> {
    operation: &'a str,
    id: String,
    #[serde(flatten)]
    measurement: &'a Measurement,
    cpu_percent: f64,
    throughput_mib_s: f64,
}

#[derive(Serialize)]
pub struct Phase {
    pub summary: CipherSummary,
    pub measurement: Measurement,
}

#[derive(Serialize)]
pub struct CryptReport {
    pub input: String,
    pub encrypted_path: String,
    pub decrypted_path: String,
    pub encrypt: Phase,
    pub decrypt: Phase,
    pub verified: bool,
}

impl CryptReport {
    /// Encrypt wall time over decrypt wall time.
    pub fn ratio(&self) -> Option<f64> {
        let dec = self.decrypt.measurement.wall_secs;
        (dec > 0.0).then(|| self.encrypt.measurement.wall_secs / dec)
    }
}

pub fn transfer(
    format: OutputFormat,
    operation: &str,
    id: &ObjectId,
    m: &Measurement,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let report = TransferReport {
                operation,
                id: id.to_string(),
                measurement: m,
                cpu_percent: m.cpu_percent(),
                throughput_mib_s: m.throughput_mib_s(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!(
                "{} {} {} ({:.2} MiB)",
                "✓".green().bold(),
                operation,
                id.to_string().yellow(),
                m.bytes as f64 / MIB
            );
            print_measurement(m);
        }
    }
    Ok(())
}

pub fn crypt(format: OutputFormat, report: &CryptReport) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        let mut value = serde_json::to_value(report)?;
        value["ratio"] = serde_json::json!(report.ratio());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Encryption".bold());
    println!("  Output:       {}", report.encrypted_path.cyan());
    print_phase(&report.encrypt);
    println!("{}", "Decryption".bold());
    println!("  Output:       {}", report.decrypted_path.cyan());
    print_phase(&report.decrypt);

    println!("{}", "Summary".bold());
    match report.ratio() {
        Some(ratio) => println!("  Enc/Dec ratio: {ratio:.2}"),
        None => println!("  Enc/Dec ratio: {}", "n/a".dimmed()),
    }
    if report.verified {
        println!("  Verified:      {} {}", "✓".green().bold(), "output matches input".green());
    } else {
        println!("  Verified:      {} {}", "✗".red().bold(), "output differs".red());
    }
    Ok(())
}

fn print_phase(phase: &Phase) {
    let s = &phase.summary;
    println!(
        "  Data:         {:.2} MiB in {} chunks",
        s.bytes_in as f64 / MIB,
        s.chunks
    );
    print_measurement(&phase.measurement);
    println!(
        "  In-vault:     enc {} ms, dec {} ms, {} bytes",
        s.encrypt_ms, s.decrypt_ms, s.total_bytes
    );
}

fn print_measurement(m: &Measurement) {
    println!("  Wall time:    {:.3} s", m.wall_secs);
    println!(
        "  CPU time:     {:.3} s (user {:.3} s, sys {:.3} s, {:.1}%)",
        m.cpu_secs(),
        m.user_secs,
        m.system_secs,
        m.cpu_percent()
    );
    println!("  Throughput:   {:.2} MiB/s", m.throughput_mib_s());
}
