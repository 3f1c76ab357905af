//! CLI front-end for the DOL/GCM patch driver.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dolhook::dol::DolTable;
use dolhook::gcm::GcmContainer;
use dolhook::patch::{driver, PatchOptions};

/// Patch a GameCube disc image with the DolHook runtime payload.
#[derive(Parser, Debug)]
#[command(name = "dolhook-patch", version, about)]
struct Cli {
    /// Path to the input .iso/.gcm disc image.
    input: PathBuf,

    /// Write the patched image here instead of overwriting `input`
    /// (a `.bak` backup of `input` is created when this is omitted).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Override the 6-character game code embedded in the header.
    #[arg(long)]
    id: Option<String>,

    /// Verbosity: 0 = errors only, 1 = info, 2 = debug.
    #[arg(long, default_value_t = 0)]
    log: u8,

    /// Run the patch algorithm without writing any output.
    #[arg(long)]
    dry_run: bool,

    /// Print the input image's DOL section table and exit.
    #[arg(long)]
    print_dol: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    stderrlog::new()
        .verbosity(cli.log as usize + 1)
        .init()
        .expect("logger already initialized");

    if cli.print_dol {
        return match print_dol(&cli.input) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let options = PatchOptions {
        game_id: cli.id,
        dry_run: cli.dry_run,
    };

    match driver::run(&cli.input, cli.out.as_deref(), &options) {
        Ok(report) => {
            log::info!(
                "patched entry {:#010x} -> {:#010x}, payload {} bytes at {:#010x}{}",
                report.original_entry,
                report.new_entry,
                report.payload_size,
                report.load_addr,
                if report.relocated { " (relocated)" } else { "" },
            );
            if report.used_default_symbols {
                log::warn!("no payload.sym found, used default symbol addresses");
            }
            if report.stamped_by_append {
                log::warn!("payload had no original-entry placeholder, appended one");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_dol(input: &std::path::Path) -> dolhook::Result<()> {
    let gcm = GcmContainer::load(input)?;
    let dol = gcm.read_dol()?;
    println!("{}", DolTable(dol.header()));
    Ok(())
}
