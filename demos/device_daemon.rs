//! Example Device (Interactive)
//!
//! Registers a message device and lets you poke at it from stdin the way
//! you would with `echo` and `cat` against a character device.

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;
use venom_mq::{DeviceConfig, DeviceHandle, MessageDevice, MqError};

fn print_help() {
    println!("Commands:");
    println!("  write <text>  - Enqueue <text> as one message");
    println!("  read [n]      - Dequeue one message into an n-byte buffer (default 4096)");
    println!("  ioctl <num>   - Issue a control request");
    println!("  len           - Show queued message count");
    println!("  exit          - Shut the device down and exit");
    println!("  help          - Show this help");
}

fn execute_command(device: &MessageDevice, handle: &DeviceHandle, input: &str) {
    let (cmd, rest) = input.split_once(' ').unwrap_or((input, ""));

    match cmd {
        "write" => match handle.write(rest.as_bytes()) {
            Ok(n) => println!("[Device] Accepted {} bytes", n),
            Err(e) => println!("[Device] Write failed: {} (errno {})", e, e.errno().raw_os_error()),
        },
        "read" => {
            let len = rest.trim().parse().unwrap_or(venom_mq::MAX_MESSAGE_SIZE);
            let mut buf = vec![0u8; len];
            match handle.read(&mut buf) {
                Ok(n) => println!("[Device] {:?}", String::from_utf8_lossy(&buf[..n])),
                Err(MqError::QueueEmpty) => println!("[Device] Nothing queued, try again"),
                Err(e) => println!("[Device] Read failed: {}", e),
            }
        }
        "ioctl" => {
            let num = rest.trim().parse().unwrap_or(0);
            if let Err(e) = handle.control(num, 0) {
                println!("[Device] {}", e);
            }
        }
        "len" => println!(
            "[Device] {} / {} messages queued",
            device.queue().len(),
            device.queue().capacity()
        ),
        "help" => print_help(),
        other => println!("Unknown command: {}", other),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("venom_mq=info")),
        )
        .init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chardev".to_string());

    let device = match MessageDevice::register(DeviceConfig::default().with_name(name)) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[Device] Failed to register: {}", e);
            std::process::exit(1);
        }
    };

    let handle = match device.open() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("[Device] Failed to open: {}", e);
            std::process::exit(1);
        }
    };

    println!("[Device] '{}' ready. Type 'help' for commands", device.name());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!(">>> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let input = input.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if input.is_empty() {
            continue;
        }
        if input == "exit" {
            break;
        }

        execute_command(&device, &handle, input);
    }

    handle.close();
    let discarded = device.shutdown();
    println!("[Device] Shut down, {} undelivered messages discarded", discarded);
}
