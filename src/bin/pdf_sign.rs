use clap::{Args, Parser, Subcommand};
use pdf_text_signing::request::{respond, ErrorResponse};
use pdf_text_signing::{Config, DocumentService, Error, SignRequest};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pdf_sign")]
#[command(about = "Store PDF documents and stamp text signatures onto them", long_about = None)]
struct Cli {
    /// JSON config file. Without it the environment and defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// The user the documents belong to
    #[arg(long, global = true, default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new PDF document
    Upload { file: PathBuf },

    /// List documents, newest first
    List,

    /// Write the original document to a file
    Get(FetchArgs),

    /// Write the signed copy of a document to a file
    GetSigned(FetchArgs),

    /// Delete a document and its signed copy
    Delete { filename: String },

    /// Stamp a text signature onto a page
    Sign(SignArgs),
}

#[derive(Args)]
struct FetchArgs {
    filename: String,
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct SignArgs {
    filename: String,
    /// 0-based page index
    #[arg(long, default_value_t = 0)]
    page: i64,
    /// Horizontal position as a fraction of the page width, from the left
    #[arg(long)]
    x: f64,
    /// Vertical position as a fraction of the page height, from the top
    #[arg(long)]
    y: f64,
    #[arg(long)]
    text: String,
    /// Serif, Sans, Monospace, Cursive, Script or Fantasy
    #[arg(long)]
    font: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let response = ErrorResponse {
                message: err.to_string(),
                error: None,
            };
            match serde_json::to_string_pretty(&response) {
                Ok(body) => eprintln!("{}", body),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

/// Exit status for a failed sign: 4 for client errors, 5 for server errors.
fn sign_failure_code(status: u16) -> u8 {
    u8::try_from(status / 100).unwrap_or(1)
}

fn run(cli: Cli) -> Result<ExitCode, Error> {
    let config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::from_env(),
    };
    let service = DocumentService::from_config(&config)?;
    let user = cli.user.as_str();

    match cli.command {
        Commands::Upload { file } => {
            let bytes = std::fs::read(&file)?;
            let original_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let document = service.upload(user, &original_name, &bytes)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::List => {
            let documents = service.list(user)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "documents": documents }))?
            );
        }
        Commands::Get(args) => {
            std::fs::write(&args.output, service.get_document(user, &args.filename)?)?;
        }
        Commands::GetSigned(args) => {
            std::fs::write(&args.output, service.get_signed_document(user, &args.filename)?)?;
        }
        Commands::Delete { filename } => {
            service.delete_document(user, &filename)?;
            println!("{}", serde_json::json!({ "message": "Document deleted" }));
        }
        Commands::Sign(args) => {
            let request = SignRequest {
                filename: Some(args.filename),
                page_number: Some(args.page),
                x_percent: Some(args.x),
                y_percent: Some(args.y),
                signature_text: Some(args.text),
                font: args.font,
            };
            let (status, body) = respond(&service.sign(user, request));
            let body = serde_json::to_string_pretty(&body)?;
            if status != 200 {
                eprintln!("{}", body);
                return Ok(ExitCode::from(sign_failure_code(status)));
            }
            println!("{}", body);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_failures_map_to_status_class() {
        assert_eq!(sign_failure_code(400), 4);
        assert_eq!(sign_failure_code(404), 4);
        assert_eq!(sign_failure_code(500), 5);
    }

    #[test]
    fn cli_parses_sign_arguments() {
        let cli = Cli::try_parse_from([
            "pdf_sign", "--user", "alice", "sign", "1700-a.pdf", "--x", "0.5", "--y", "0.1",
            "--text", "Alice",
        ])
        .unwrap();
        assert_eq!(cli.user, "alice");
        match cli.command {
            Commands::Sign(args) => {
                assert_eq!(args.page, 0);
                assert_eq!((args.x, args.y), (0.5, 0.1));
                assert!(args.font.is_none());
            }
            _ => panic!("expected sign command"),
        }
    }
}
