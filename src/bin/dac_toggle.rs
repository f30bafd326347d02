use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dp2031_bench::{
    dac::{DAC_CONFIG_FILE, Dac, DacLevels, toggle_file},
    error::DacError,
};
use inquire::Select;
use strum::IntoEnumIterator;

const CYCLE_PAUSE: Duration = Duration::from_secs(5);

fn usage() {
    eprintln!("usage: dac-toggle <1-7 | --cycle> [config file, default {DAC_CONFIG_FILE}]");
}

fn apply(path: &Path, dac: Dac, levels: &DacLevels) {
    match toggle_file(path, dac, levels) {
        Ok(report) if report.modified() => {
            for change in &report.changes {
                println!("Set {} to {}V", change.dac, levels.literal(change.level));
            }
        }
        Ok(_) => println!("File unchanged, {dac} is already the active DAC."),
        Err(DacError::NotFound(path)) => eprintln!("Error: file '{}' not found.", path.display()),
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let mut args = env::args().skip(1);
    let selection = args.next();
    let path = PathBuf::from(args.next().unwrap_or_else(|| DAC_CONFIG_FILE.to_string()));
    let levels = DacLevels::default();

    match selection.as_deref() {
        Some("--cycle") => {
            for (step, dac) in Dac::iter().enumerate() {
                if step > 0 {
                    std::thread::sleep(CYCLE_PAUSE);
                }
                println!("\n--- {dac} ---");
                apply(&path, dac, &levels);
            }
        }
        Some(index) => {
            let Some(dac) = index.parse().ok().and_then(|i| Dac::from_index(i).ok()) else {
                usage();
                return;
            };
            apply(&path, dac, &levels);
        }
        None => match Select::new("Which DAC should be active?", Dac::iter().collect()).prompt() {
            Ok(dac) => apply(&path, dac, &levels),
            Err(e) => eprintln!("{e}"),
        },
    }
}
