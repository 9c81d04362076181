use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tvault",
    about = "tvault: chunked object storage and streaming encryption behind a trust boundary",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration for the trusted side
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep objects under this directory (overrides the configured backend)
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as a persistent object
    Store(StoreArgs),
    /// Read a persistent object back out
    Fetch(FetchArgs),
    /// Delete a persistent object
    Delete(DeleteArgs),
    /// Encrypt a file, decrypt it again on the same session, and report timings
    Crypt(CryptArgs),
    /// Generate a deterministic test file
    Gen(GenArgs),
}

#[derive(Args)]
pub struct StoreArgs {
    /// Object id (text, or hex with a 0x prefix)
    pub id: String,
    pub input: PathBuf,
}

#[derive(Args)]
pub struct FetchArgs {
    pub id: String,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub id: String,
}

#[derive(Args)]
pub struct CryptArgs {
    pub input: PathBuf,
    /// Directory for the .enc and .dec outputs (defaults to the input's directory)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct GenArgs {
    pub output: PathBuf,
    /// Size in bytes
    #[arg(short, long, default_value_t = 1024 * 1024)]
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_store() {
        let cli = Cli::try_parse_from(["tvault", "store", "obj1", "data.bin"]).unwrap();
        if let Command::Store(args) = cli.command {
            assert_eq!(args.id, "obj1");
            assert_eq!(args.input, PathBuf::from("data.bin"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_fetch_with_output() {
        let cli = Cli::try_parse_from(["tvault", "fetch", "obj1", "-o", "out.bin"]).unwrap();
        if let Command::Fetch(args) = cli.command {
            assert_eq!(args.output, Some(PathBuf::from("out.bin")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_delete() {
        let cli = Cli::try_parse_from(["tvault", "delete", "0x01ff"]).unwrap();
        assert!(matches!(cli.command, Command::Delete(_)));
    }

    #[test]
    fn parse_crypt_out_dir() {
        let cli = Cli::try_parse_from(["tvault", "crypt", "in.bin", "--out-dir", "/tmp"]).unwrap();
        if let Command::Crypt(args) = cli.command {
            assert_eq!(args.out_dir, Some(PathBuf::from("/tmp")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_gen_default_size() {
        let cli = Cli::try_parse_from(["tvault", "gen", "test.bin"]).unwrap();
        if let Command::Gen(args) = cli.command {
            assert_eq!(args.size, 1024 * 1024);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "tvault", "delete", "x", "--verbose", "--format", "json", "--storage-root", "/var/tv",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.storage_root, Some(PathBuf::from("/var/tv")));
        assert!(cli.config.is_none());
    }

    #[test]
    fn missing_id_rejected() {
        assert!(Cli::try_parse_from(["tvault", "fetch"]).is_err());
    }
}
