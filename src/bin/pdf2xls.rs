use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pdf2xls::{ConversionReport, ConversionRequest, convert};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pdf2xls", version, about = "Convert a PDF page range into an Excel workbook")]
struct Cli {
    /// Path to the input PDF file.
    #[arg(short = 'i', long = "input_file")]
    input_file: PathBuf,

    /// Path to the output Excel file (.xlsx).
    #[arg(short = 'o', long = "output_file")]
    output_file: PathBuf,

    /// Page number to start the conversion, 1-based.
    #[arg(short = 's', long = "start_page", default_value_t = 1)]
    start_page: u32,

    /// Page number to stop the conversion, inclusive; defaults to the last
    /// page of the document.
    #[arg(short = 'e', long = "end_page")]
    end_page: Option<u32>,

    /// Height of the header band to ignore, in millimeters.
    #[arg(long = "header_height_mm", default_value_t = 0.0)]
    header_height_mm: f32,

    /// Height of the footer band to ignore, in millimeters.
    #[arg(long = "footer_height_mm", default_value_t = 0.0)]
    footer_height_mm: f32,

    /// Increase output verbosity.
    #[arg(long)]
    verbose: bool,
}

fn run(cli: &Cli) -> Result<ConversionReport> {
    let request = ConversionRequest {
        input_file: cli.input_file.clone(),
        output_file: cli.output_file.clone(),
        start_page: cli.start_page,
        end_page: cli.end_page,
        header_height_mm: cli.header_height_mm,
        footer_height_mm: cli.footer_height_mm,
    };
    convert(&request)
        .with_context(|| format!("failed to convert '{}'", cli.input_file.display()))
}

fn main() -> ExitCode {
    // clap short flags are single characters; the two-letter spellings are
    // rewritten to their long forms before parsing.
    let args = std::env::args()
        .map(|arg| match arg.as_str() {
            "-hh" => "--header_height_mm".to_string(),
            "-fh" => "--footer_height_mm".to_string(),
            _ => arg,
        })
        .collect::<Vec<_>>();
    let cli = Cli::parse_from(args);

    let default_filter = if cli.verbose {
        "pdf2xls=debug"
    } else {
        "pdf2xls=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    match run(&cli) {
        Ok(report) => {
            println!(
                "PDF data successfully converted to {}",
                cli.output_file.display()
            );
            if cli.verbose {
                eprintln!(
                    "processed {} page(s): {} text block(s), {} table(s)",
                    report.pages, report.text_blocks, report.tables
                );
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
