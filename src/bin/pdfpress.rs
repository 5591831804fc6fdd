//! Compress, protect, decrypt and inspect PDFs from the command line.
//!
//! Usage:
//!   pdfpress compress [-o OUT] IN...
//!   pdfpress protect -p PASSWORD [-o OUT] [--owner PASSWORD] [--algorithm NAME] IN
//!   pdfpress decrypt -p PASSWORD [-o OUT] IN
//!   pdfpress info IN
//!
//! Algorithms: rc4-40, rc4-128, aes-128 (default), aes-256.
//! Set RUST_LOG=info for statistics, RUST_LOG=debug for parser recovery details.

use pdf_press::api;
use pdf_press::config::{EngineConfig, ProtectOptions};
use pdf_press::encryption::Algorithm;
use pdf_press::error::{Error, ErrorClass};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "\
Usage:
  pdfpress compress [-o OUT] IN...
  pdfpress protect -p PASSWORD [-o OUT] [--owner PASSWORD] [--algorithm NAME] IN
  pdfpress decrypt -p PASSWORD [-o OUT] IN
  pdfpress info IN";

#[derive(Debug, Default)]
struct Args {
    command: String,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    password: Option<String>,
    owner_password: Option<String>,
    algorithm: Option<Algorithm>,
}

impl Args {
    fn parse(raw: &[String]) -> Result<Self, String> {
        let mut args = Self::default();
        let mut iter = raw.iter();
        args.command = iter.next().cloned().ok_or("missing command")?;

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| iter.next().cloned().ok_or_else(|| format!("{} needs a value", flag));
            match arg.as_str() {
                "-o" | "--output" => args.output = Some(PathBuf::from(value(arg)?)),
                "-p" | "--password" => args.password = Some(value(arg)?),
                "--owner" => args.owner_password = Some(value(arg)?),
                "--algorithm" => args.algorithm = Some(value(arg)?.parse()?),
                "-h" | "--help" => return Err(String::new()),
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(format!("unknown option {}", flag));
                },
                input => args.inputs.push(PathBuf::from(input)),
            }
        }
        Ok(args)
    }

    fn single_input(&self) -> Result<&PathBuf, String> {
        match self.inputs.as_slice() {
            [input] => Ok(input),
            [] => Err(format!("{} needs an input file", self.command)),
            _ => Err(format!("{} takes exactly one input file", self.command)),
        }
    }

    fn password(&self) -> Result<&str, String> {
        self.password
            .as_deref()
            .ok_or_else(|| format!("{} needs -p PASSWORD", self.command))
    }
}

#[derive(Debug)]
enum Failure {
    Usage(String),
    Pdf(Error),
}

impl From<String> for Failure {
    fn from(msg: String) -> Self {
        Failure::Usage(msg)
    }
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::Pdf(err)
    }
}

impl From<std::io::Error> for Failure {
    fn from(err: std::io::Error) -> Self {
        Failure::Pdf(Error::Io(err))
    }
}

fn run(args: &Args) -> Result<(), Failure> {
    let config = EngineConfig::default();

    match args.command.as_str() {
        "compress" | "merge" => {
            if args.inputs.is_empty() {
                return Err(Failure::Usage("compress needs at least one input file".to_string()));
            }
            let buffers = args.inputs.iter().map(fs::read).collect::<Result<Vec<_>, _>>()?;
            let views: Vec<&[u8]> = buffers.iter().map(Vec::as_slice).collect();

            let (bytes, stats) = api::compress_with(&views, &config)?;
            let output = args.output.clone().unwrap_or_else(|| PathBuf::from("compressed.pdf"));
            fs::write(&output, &bytes)?;

            let before: usize = buffers.iter().map(Vec::len).sum();
            println!(
                "Wrote {} ({} pages, {} -> {} bytes, {} duplicate objects merged)",
                output.display(),
                stats.pages,
                before,
                bytes.len(),
                stats.duplicates_merged
            );
        },
        "protect" => {
            let input = fs::read(args.single_input()?)?;
            let mut options = ProtectOptions::new(args.password()?);
            if let Some(owner) = &args.owner_password {
                options = options.with_owner_password(owner.clone());
            }
            if let Some(algorithm) = args.algorithm {
                options = options.with_algorithm(algorithm);
            }

            let bytes = api::protect_with(&input, &options, &config)?;
            let output = args.output.clone().unwrap_or_else(|| PathBuf::from("protected.pdf"));
            fs::write(&output, bytes)?;
            println!("Wrote {} ({})", output.display(), options.algorithm);
        },
        "decrypt" => {
            let input = fs::read(args.single_input()?)?;
            let bytes = api::decrypt_with(&input, args.password()?, &config)?;
            let output = args.output.clone().unwrap_or_else(|| PathBuf::from("decrypted.pdf"));
            fs::write(&output, bytes)?;
            println!("Wrote {}", output.display());
        },
        "info" => {
            let input = fs::read(args.single_input()?)?;
            let summary = api::inspect(&input)?;
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| Failure::Usage(format!("cannot format summary: {}", e)))?;
            println!("{}", json);
        },
        other => return Err(Failure::Usage(format!("unknown command {}", other))),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let result = Args::parse(&raw).map_err(Failure::Usage).and_then(|args| run(&args));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Usage(msg)) => {
            if !msg.is_empty() {
                eprintln!("Error: {}", msg);
            }
            eprintln!("{}", USAGE);
            ExitCode::from(2)
        },
        Err(Failure::Pdf(err)) => {
            let kind = match err.class() {
                ErrorClass::Unreadable => "unreadable input",
                ErrorClass::Unsupported => "unsupported request",
                ErrorClass::Denied => "access denied",
            };
            eprintln!("Error ({}): {}", kind, err);
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_protect() {
        let args = Args::parse(&strings(&["protect", "-p", "pw", "--algorithm", "aes-256", "in.pdf"])).unwrap();
        assert_eq!(args.command, "protect");
        assert_eq!(args.password.as_deref(), Some("pw"));
        assert_eq!(args.algorithm, Some(Algorithm::Aes256));
        assert_eq!(args.single_input().unwrap(), &PathBuf::from("in.pdf"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Args::parse(&[]).is_err());
        assert!(Args::parse(&strings(&["protect", "-p"])).is_err());
        assert!(Args::parse(&strings(&["info", "--bogus"])).is_err());
        assert!(Args::parse(&strings(&["protect", "--algorithm", "des", "a.pdf"])).is_err());
    }

    #[test]
    fn test_compress_many_inputs() {
        let args = Args::parse(&strings(&["compress", "-o", "out.pdf", "a.pdf", "b.pdf"])).unwrap();
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.output, Some(PathBuf::from("out.pdf")));
        assert!(args.single_input().is_err());
    }
}
