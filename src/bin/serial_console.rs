use std::env;

use dp2031_bench::{serial::SerialController, transport::DEFAULT_BAUD_RATE};
use inquire::{Select, Text};

const QUIT: &str = "quit";

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut controller = SerialController::new();

    // Port from the first argument, or pick from the ports the host reports.
    let port_name = match env::args().nth(1) {
        Some(name) => name,
        None => {
            let ports = match controller.scan_ports() {
                Ok(ports) => ports,
                Err(e) => {
                    eprintln!("{e}");
                    return;
                }
            };
            if ports.is_empty() {
                eprintln!("No serial ports found!");
                return;
            }
            match Select::new("Select a serial port:", ports.into_iter().collect()).prompt() {
                Ok(name) => name,
                Err(e) => {
                    eprintln!("{e}");
                    return;
                }
            }
        }
    };
    let baud_rate = match env::args().nth(2) {
        Some(baud) => match baud.parse() {
            Ok(baud) => baud,
            Err(_) => {
                eprintln!("Invalid baud rate '{baud}'");
                return;
            }
        },
        None => DEFAULT_BAUD_RATE,
    };

    match controller.connect(&port_name, baud_rate) {
        Ok(message) => println!("{message}"),
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    }

    loop {
        let command = match Text::new("Command:")
            .with_help_message("sent with a trailing newline, type 'quit' to exit")
            .prompt()
        {
            Ok(command) => command,
            Err(_) => break,
        };
        if command.trim() == QUIT {
            break;
        }
        match controller.send_command(&command) {
            Ok(ack) => println!("{ack}: {command}"),
            Err(e) => eprintln!("{e}"),
        }
    }

    controller.disconnect();
    println!("Serial port disconnected");
}
