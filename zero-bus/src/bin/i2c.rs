//! Command-line interface for zero-bus.
//!
//! Runs single transfers against a bus device, or an interactive shell
//! that accepts the same commands until `quit` or end of input.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use zero_bus::tracing::{self, prelude::*};
use zero_bus::transport::Transport;
use zero_bus::{AddressMode, BusConfig, DeviceAddress, I2cBus, RegisterAddress};

const PROMPT: &str = "i2c>> ";

#[derive(Parser, Debug)]
#[command(name = "zero-i2c", version, about = "Read and write I2C devices through /dev/i2c-N")]
struct Cli {
    /// Bus device, e.g. /dev/i2c-1
    #[arg(short, long)]
    device: PathBuf,

    /// JSON file with `timeout_ms` and `retries`; otherwise ZERO_I2C_* env
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat device addresses as 10-bit
    #[arg(long)]
    ten_bit: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    #[command(flatten)]
    Bus(BusCommand),
    /// Interactive shell
    Shell,
}

#[derive(Subcommand, Debug, PartialEq)]
enum BusCommand {
    /// Write bytes to a device
    Write {
        #[arg(value_parser = parse_number::<u16>)]
        addr: u16,
        #[arg(required = true, value_parser = parse_number::<u8>)]
        data: Vec<u8>,
    },
    /// Read bytes from a device
    Read {
        #[arg(value_parser = parse_number::<u16>)]
        addr: u16,
        #[arg(value_parser = parse_len)]
        len: usize,
    },
    /// Write bytes to a register or memory address of a device
    ClientWrite {
        #[arg(value_parser = parse_number::<u16>)]
        addr: u16,
        #[arg(value_parser = parse_number::<u32>)]
        address: u32,
        /// Register address width in bytes
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
        addr_size: u8,
        #[arg(required = true, value_parser = parse_number::<u8>)]
        data: Vec<u8>,
    },
    /// Read bytes from a register or memory address of a device
    ClientRead {
        #[arg(value_parser = parse_number::<u16>)]
        addr: u16,
        #[arg(value_parser = parse_number::<u32>)]
        address: u32,
        #[arg(value_parser = parse_len)]
        len: usize,
        /// Register address width in bytes
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
        addr_size: u8,
    },
}

/// One line typed at the shell prompt.
#[derive(Parser, Debug)]
#[command(name = "i2c", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ShellCommand {
    #[command(flatten)]
    Bus(BusCommand),
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Parse decimal or `0x`-prefixed hex.
fn parse_number<T: TryFrom<u64>>(s: &str) -> Result<T, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    }
    .map_err(|e| format!("invalid number '{s}': {e}"))?;
    T::try_from(value).map_err(|_| format!("{s} is out of range"))
}

/// Parse a read length; a single message carries at most `u16::MAX` bytes.
fn parse_len(s: &str) -> Result<usize, String> {
    match parse_number::<usize>(s)? {
        0 => Err("length must be at least 1".to_string()),
        n if n > usize::from(u16::MAX) => Err(format!(
            "length {s} exceeds the {} byte message limit",
            u16::MAX
        )),
        n => Ok(n),
    }
}

/// Split a shell line into words; commas and brackets act as spaces so
/// lists like `[0x01, 0x02]` work.
fn shell_words(line: &str) -> Vec<String> {
    line.replace([',', '[', ']'], " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn format_bytes(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("0x{b:02X}")).collect();
    format!("[{}]", items.join(", "))
}

fn device_address(addr: u16, ten_bit: bool) -> zero_bus::Result<DeviceAddress> {
    let mode = if ten_bit {
        AddressMode::TenBit
    } else {
        AddressMode::SevenBit
    };
    DeviceAddress::new(addr, mode)
}

/// Run one command; returns the bytes read, if it was a read.
fn execute<T: Transport>(
    bus: &mut I2cBus<T>,
    ten_bit: bool,
    command: &BusCommand,
) -> zero_bus::Result<Option<Vec<u8>>> {
    match command {
        BusCommand::Write { addr, data } => {
            bus.write(device_address(*addr, ten_bit)?, data)?;
            Ok(None)
        }
        BusCommand::Read { addr, len } => {
            let mut buffer = vec![0u8; *len];
            bus.read(device_address(*addr, ten_bit)?, &mut buffer)?;
            Ok(Some(buffer))
        }
        BusCommand::ClientWrite {
            addr,
            address,
            addr_size,
            data,
        } => {
            let address = RegisterAddress::new(*address, usize::from(*addr_size))?;
            bus.address_write(device_address(*addr, ten_bit)?, address, data)?;
            Ok(None)
        }
        BusCommand::ClientRead {
            addr,
            address,
            len,
            addr_size,
        } => {
            let address = RegisterAddress::new(*address, usize::from(*addr_size))?;
            let mut buffer = vec![0u8; *len];
            bus.address_read(device_address(*addr, ten_bit)?, address, &mut buffer)?;
            Ok(Some(buffer))
        }
    }
}

fn report(result: zero_bus::Result<Option<Vec<u8>>>, out: &mut impl Write) -> io::Result<()> {
    match result {
        Ok(Some(data)) => writeln!(out, "{}", format_bytes(&data)),
        Ok(None) => writeln!(out, "Done"),
        Err(e) => writeln!(out, "{e}"),
    }
}

fn run_shell<T: Transport>(
    bus: &mut I2cBus<T>,
    ten_bit: bool,
    input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "Welcome to I2C shell. Type help or ? to list the commands")?;
    write!(out, "{PROMPT}")?;
    out.flush()?;

    for line in input.lines() {
        let words = shell_words(&line?);
        if !words.is_empty() {
            let words: Vec<String> = if words[0] == "?" {
                vec!["help".to_string()]
            } else {
                words
            };
            match ShellLine::try_parse_from(words) {
                Ok(ShellLine {
                    command: ShellCommand::Quit,
                }) => break,
                Ok(ShellLine {
                    command: ShellCommand::Bus(command),
                }) => {
                    debug!("Shell command: {:?}", command);
                    report(execute(bus, ten_bit, &command), out)?;
                }
                Err(e) => write!(out, "{e}")?,
            }
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing::init_journald_or_stderr(tracing::level_for_verbosity(cli.verbose));

    let config = match &cli.config {
        Some(path) => BusConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BusConfig::from_env(),
    };
    debug!("Using {:?}", config);

    let mut bus = I2cBus::open_with_config(&cli.device, &config)?;

    match &cli.command {
        Command::Bus(command) => {
            let result = execute(&mut bus, cli.ten_bit, command);
            if let Err(e) = &result {
                error!("{}", e);
            }
            let data = result?;
            report(Ok(data), &mut io::stdout().lock())?;
        }
        Command::Shell => {
            info!("Shell on {}", bus.path().display());
            run_shell(&mut bus, cli.ten_bit, io::stdin().lock(), &mut io::stdout())?;
        }
    }

    bus.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use zero_bus::Message;

    /// Answers each read with the bytes of the most recent write.
    #[derive(Default)]
    struct Loopback {
        last_write: Vec<u8>,
        writes: Vec<Vec<u8>>,
    }

    impl Transport for Loopback {
        fn set_timeout(&mut self, _ticks: u32) -> nix::Result<()> {
            Ok(())
        }

        fn set_retries(&mut self, _retries: u32) -> nix::Result<()> {
            Ok(())
        }

        fn transfer(&mut self, msgs: &mut [Message<'_>]) -> nix::Result<()> {
            for msg in msgs.iter_mut() {
                match msg {
                    Message::Write { data, .. } => {
                        self.last_write = data.to_vec();
                        self.writes.push(data.to_vec());
                    }
                    Message::Read { buffer, .. } => {
                        for (i, b) in buffer.iter_mut().enumerate() {
                            *b = self.last_write.get(i).copied().unwrap_or(0);
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn loopback_bus() -> I2cBus<Loopback> {
        I2cBus::with_transport("/dev/i2c-test", Loopback::default(), &BusConfig::default()).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
        ShellLine::command().debug_assert();
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<u8>("0x50"), Ok(0x50));
        assert_eq!(parse_number::<u8>("0X1f"), Ok(0x1F));
        assert_eq!(parse_number::<u16>("80"), Ok(80));
        assert!(parse_number::<u8>("0x100").is_err());
        assert!(parse_number::<u8>("abc").is_err());
        assert!(parse_len("0").is_err());
        assert_eq!(parse_len("4"), Ok(4));
        assert_eq!(parse_len("65535"), Ok(65535));
        assert!(parse_len("65536").is_err());
        assert!(parse_len("0xFFFFFFFFFFFFFFFF").is_err());
    }

    #[test]
    fn test_parse_client_read() {
        let cli = Cli::try_parse_from([
            "zero-i2c", "-d", "/dev/i2c-1", "client-read", "0x50", "0x10", "4", "--addr-size", "2",
        ])
        .unwrap();
        assert_eq!(cli.device, PathBuf::from("/dev/i2c-1"));
        assert_eq!(
            cli.command,
            Command::Bus(BusCommand::ClientRead {
                addr: 0x50,
                address: 0x10,
                len: 4,
                addr_size: 2,
            })
        );
    }

    #[test]
    fn test_parse_rejects_empty_write() {
        assert!(Cli::try_parse_from(["zero-i2c", "-d", "/dev/i2c-1", "write", "0x50"]).is_err());
        let args = ["zero-i2c", "-d", "/dev/i2c-1", "read", "0x50", "0"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_shell_words() {
        assert_eq!(
            shell_words("write 0x50 [0x01, 0x02]"),
            vec!["write", "0x50", "0x01", "0x02"]
        );
        assert!(shell_words("   ").is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[0x0A, 0xFF]), "[0x0A, 0xFF]");
        assert_eq!(format_bytes(&[]), "[]");
    }

    #[test]
    fn test_execute_client_write_then_read() {
        let mut bus = loopback_bus();
        let write = BusCommand::ClientWrite {
            addr: 0x50,
            address: 0x10,
            addr_size: 1,
            data: vec![0xAA, 0xBB],
        };
        assert_eq!(execute(&mut bus, false, &write).unwrap(), None);
        assert_eq!(bus.transport().writes, vec![vec![0x10, 0xAA, 0xBB]]);

        let read = BusCommand::ClientRead {
            addr: 0x50,
            address: 0x10,
            len: 2,
            addr_size: 1,
        };
        // The loopback echoes the address byte just written
        assert_eq!(execute(&mut bus, false, &read).unwrap(), Some(vec![0x10, 0x00]));
    }

    #[test]
    fn test_execute_rejects_wide_address_without_ten_bit() {
        let mut bus = loopback_bus();
        let write = BusCommand::Write {
            addr: 0x150,
            data: vec![1],
        };
        assert!(execute(&mut bus, false, &write).is_err());
        assert!(execute(&mut bus, true, &write).is_ok());
    }

    #[test]
    fn test_shell_session() {
        let mut bus = loopback_bus();
        let input = "write 0x50 1 2\nread 0x50 2\nbogus\nquit\nread 0x50 1\n";
        let mut out = Vec::new();
        run_shell(&mut bus, false, input.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Done"), "{text}");
        assert!(text.contains("[0x01, 0x02]"), "{text}");
        assert!(text.contains("bogus"), "{text}");
        // Nothing after quit runs
        assert_eq!(bus.transport().writes.len(), 1);
    }

    #[test]
    fn test_shell_reports_errors_and_continues() {
        let mut bus = loopback_bus();
        let input = "client-write 0x50 0x1234 5\nwrite 0x50 9\n";
        let mut out = Vec::new();
        run_shell(&mut bus, false, input.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Invalid register address"), "{text}");
        assert_eq!(bus.transport().writes, vec![vec![9]]);
    }

    #[test]
    fn test_shell_rejects_oversized_length_and_continues() {
        let mut bus = loopback_bus();
        let input = "read 0x50 0xFFFFFFFFFFFFFFFF\nclient-read 0x50 0 70000\nwrite 0x50 1\n";
        let mut out = Vec::new();
        run_shell(&mut bus, false, input.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("exceeds the 65535 byte message limit"), "{text}");
        assert!(text.contains("Done"), "{text}");
        assert_eq!(bus.transport().writes, vec![vec![1]]);
    }
}
