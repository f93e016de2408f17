use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use docx_brandfix::{BrandProfile, Error, ErrorResponse, ExternalConverter, Outcome, Pipeline};

#[derive(Parser)]
#[command(
    name = "docx-brandfix",
    about = "Bring Word documents in line with a brand style guide"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Directory for the fixed document and change log
    #[arg(long, global = true, default_value = "output")]
    output_dir: PathBuf,
    /// Brand profile JSON (defaults to the built-in profile)
    #[arg(long, global = true)]
    brand: Option<PathBuf>,
    /// Directory the logo path is resolved against (defaults to the executable's directory)
    #[arg(long, global = true)]
    assets: Option<PathBuf>,
    /// Program used to convert PDF input
    #[arg(long, global = true)]
    converter: Option<String>,
    /// Print the service JSON response instead of a summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Fix an existing DOCX or PDF file
    Fix {
        input: PathBuf,
    },
    /// Create a document from a text file, or stdin with `-`
    Create {
        text: PathBuf,
    },
}

fn default_assets() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn read_text(source: &Path) -> Result<String, Error> {
    if source == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(source)?)
    }
}

fn run(args: &Args) -> Result<Outcome, Error> {
    let brand = match &args.brand {
        Some(path) => BrandProfile::from_json_file(path)?,
        None => BrandProfile::default(),
    };
    let mut pipeline = Pipeline::new(brand, &args.output_dir)
        .with_assets(args.assets.clone().unwrap_or_else(default_assets));
    if let Some(program) = &args.converter {
        pipeline = pipeline.with_converter(Box::new(ExternalConverter::with_program(program)));
    }

    match &args.command {
        Command::Fix { input } => {
            if !input.is_file() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("file not found: {}", input.display()),
                )));
            }
            pipeline.fix(input)
        }
        Command::Create { text } => pipeline.create(&read_text(text)?),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(outcome) if args.json => match serde_json::to_string_pretty(&outcome.response()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Ok(outcome) => {
            let summary = outcome.summary();
            println!("Document: {}", outcome.document.display());
            println!("Change log: {}", outcome.change_log.display());
            println!(
                "Fixes: {} ({} font), logo {}",
                summary.total_fixes,
                summary.font_fixes,
                if summary.logo_added { "added" } else { "skipped" }
            );
        }
        Err(e) if args.json => {
            let body = serde_json::to_string(&ErrorResponse::from(&e))
                .unwrap_or_else(|_| format!("{{\"error\":\"{e}\"}}"));
            println!("{body}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
