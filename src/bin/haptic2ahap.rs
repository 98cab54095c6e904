//! Converts a .haptic file to Apple .ahap files.
//!
//! By default the output is split into a continuous and a transients AHAP,
//! which need to be played in parallel for correct playback. A unified AHAP
//! would apply the parameter curves of the continuous events to the
//! transients too, undesirably modifying their intensity and sharpness.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use haptics_core::datamodel::{self, ahap::Ahap};
use std::path::Path;

#[derive(Parser)]
#[command(version, about = "Converts a .haptic file to Apple .ahap files")]
struct Args {
    /// Input .haptic file to be converted to .ahap
    input: String,

    /// Create a unified AHAP file instead of splitting it into two
    /// (continuous and transients). Note that a unified AHAP file will not
    /// play back transients correctly.
    #[arg(short, long)]
    no_split: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let Some(filename) = args.input.strip_suffix(".haptic") else {
        bail!("Input '{}' should be a .haptic file", args.input);
    };

    let haptic_data = load_haptic_data_from_file(&args.input)?;

    if args.no_split {
        let ahap = Ahap::from(haptic_data);
        export_string_to_ahap_file(
            filename,
            &Ahap::to_string_pretty(&ahap).map_err(|err| anyhow!(err))?,
        )?;
    } else {
        let (continuous, transients) = Ahap::from(haptic_data).into_continuous_and_transients_ahaps();

        export_string_to_ahap_file(
            &format!("{}_continuous", filename),
            &Ahap::to_string_pretty(&continuous).map_err(|err| anyhow!(err))?,
        )?;

        if let Some(transients) = transients {
            export_string_to_ahap_file(
                &format!("{}_transients", filename),
                &Ahap::to_string_pretty(&transients).map_err(|err| anyhow!(err))?,
            )?;
        }
    }

    Ok(())
}

/// Loads a clip from `path` and upgrades it to the latest format version
fn load_haptic_data_from_file(path: &str) -> Result<datamodel::latest::DataModel> {
    let haptic_json_string = std::fs::read_to_string(path)
        .with_context(|| format!("Error reading input from '{}'", path))?;
    let data_model = datamodel::from_json(&haptic_json_string).map_err(|err| anyhow!(err))?;
    let (_, data_model) = datamodel::upgrade_to_latest(&data_model).map_err(|err| anyhow!(err))?;
    Ok(data_model)
}

/// Writes `data` to `filename`.ahap
fn export_string_to_ahap_file(filename: &str, data: &str) -> Result<()> {
    let output_file = format!("{}.ahap", filename);
    let path = Path::new(&output_file);
    std::fs::write(path, data).with_context(|| format!("Couldn't write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
