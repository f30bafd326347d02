use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use chrono::Local;
use dp2031_bench::{
    check::{ChannelOutcome, check_ranges},
    plot::{render_plot, show_plot},
    prompt,
    report::{self, DEFAULT_RESULTS_DIR, OutputPaths},
    scpi::Dp2031,
    sequencer::{Recording, SequenceConfig, Sequencer},
    transport::{Link, Resource},
    types::{ChannelId, ChannelSpec, ExpectedRange},
};
use inquire::Text;

const RESOURCE_ENV: &str = "DP2031_RESOURCE";
const IO_TIMEOUT: Duration = Duration::from_secs(2);
const RESET_DELAY: Duration = Duration::from_millis(100);

/// (channel, volts, amp limit), powered on in this order.
const POWER_ON_PLAN: [(u8, f64, f64); 3] = [(1, 2.3, 0.5), (2, 1.6, 0.5), (3, 6.0, 1.0)];

/// (channel, min amps, max amps) of the settled current.
const EXPECTED_CURRENT: [(u8, f64, f64); 3] = [(1, 0.15, 0.2), (2, 0.0, 0.001), (3, 0.25, 0.35)];

fn channel(number: u8) -> ChannelId {
    ChannelId::new(number).expect("channel numbers in the plan start at 1")
}

fn resource_name() -> Option<String> {
    if let Some(name) = env::args().nth(1) {
        return Some(name);
    }
    if let Ok(name) = env::var(RESOURCE_ENV) {
        return Some(name);
    }
    Text::new("Instrument resource:")
        .with_help_message("TCPIP0::<ip>::5555::SOCKET, <ip>:<port> or a serial port")
        .prompt()
        .ok()
}

fn connect(resource: &Resource) -> Option<Dp2031<Link>> {
    let link = match resource.open(IO_TIMEOUT) {
        Ok(link) => link,
        Err(e) => {
            eprintln!("Failed to connect to DP2031 at {resource}: {e}");
            return None;
        }
    };
    let mut psu = Dp2031::new(link);
    match psu.identify() {
        Ok(idn) => println!("Connected to DP2031: {idn}"),
        Err(e) => {
            eprintln!("Failed to connect to DP2031 at {resource}: {e}");
            return None;
        }
    }
    if let Err(e) = psu.reset() {
        eprintln!("Failed to reset DP2031: {e}");
        return None;
    }
    std::thread::sleep(RESET_DELAY);
    Some(psu)
}

fn report_run(
    recording: &Recording,
    sequencer: &Sequencer,
    ranges: &BTreeMap<ChannelId, ExpectedRange>,
) {
    let check = check_ranges(sequencer.plan(), recording, ranges);

    println!("\n--- Range check ---");
    for item in &check.channels {
        match item.outcome {
            ChannelOutcome::Measured { peak, range, verdict } => println!(
                "{}: peak {peak:.4} A, expected {:.4}-{:.4} A -> {verdict}",
                item.channel, range.min, range.max
            ),
            ChannelOutcome::NoData => println!("{}: no current data collected", item.channel),
        }
    }
    println!("{}", report::conclusion(check.overall()));

    let suffix = prompt::ask_suffix().unwrap_or_else(|_| prompt::suffix_or_default(""));
    let paths = OutputPaths::new(DEFAULT_RESULTS_DIR, &suffix);
    println!("Log: {}", paths.log.display());
    println!("Plot: {}", paths.plot.display());

    let block = report::render_log(recording, &check, &Local::now());
    match report::append_log(&paths.log, &block) {
        Ok(()) => println!("Samples and range check appended to {}", paths.log.display()),
        Err(e) => eprintln!("Failed to save log: {e}"),
    }
    match render_plot(&paths.plot, recording) {
        Ok(()) => {
            println!("Voltage/current plot saved to {}", paths.plot.display());
            if prompt::confirm("Show the plot?").unwrap_or(false) {
                if let Err(e) = show_plot(&paths.plot) {
                    eprintln!("{e}");
                }
            }
        }
        Err(e) => eprintln!("No plot written: {e}"),
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(resource) = resource_name() else {
        eprintln!("No instrument resource given.");
        return;
    };
    let resource = Resource::parse(&resource);
    let Some(mut psu) = connect(&resource) else {
        return;
    };

    let plan: Vec<ChannelSpec> = POWER_ON_PLAN
        .iter()
        .map(|&(ch, volts, amps)| ChannelSpec::new(channel(ch), volts, amps))
        .collect();
    let ranges: BTreeMap<ChannelId, ExpectedRange> = EXPECTED_CURRENT
        .iter()
        .map(|&(ch, min, max)| (channel(ch), ExpectedRange::new(min, max)))
        .collect();
    let sequencer = Sequencer::new(plan, SequenceConfig::default());

    loop {
        println!("Powering on in sequence and recording voltage and current...");
        let mut recording = Recording::for_plan(sequencer.plan());
        match sequencer.run(&mut psu, &mut recording) {
            Ok(()) => println!("All channels powered on and sampled."),
            Err(e) => eprintln!("Sequence aborted: {e}"),
        }
        report_run(&recording, &sequencer, &ranges);

        if prompt::confirm("Switch off all channel outputs?").unwrap_or(true) {
            match sequencer.shutdown(&mut psu) {
                Ok(()) => println!("All channel outputs off."),
                Err(e) => eprintln!("Error while switching outputs off: {e}"),
            }
        } else {
            println!("Skipped. Outputs stay on.");
        }

        if prompt::confirm("Close the connection to the DP2031?").unwrap_or(true) {
            drop(psu.into_inner());
            println!("DP2031 connection closed.");
            break;
        }
        println!("Connection kept open.");
        if !prompt::confirm("Run the sequence again?").unwrap_or(false) {
            break;
        }
    }
}
