// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2022 Takashi Sakamoto

use {
    super::{LogLevel, RuntimeOperation},
    clap::Parser,
    firewire_protocols_core::*,
    std::{path::Path, str::FromStr},
    tracing::{debug, debug_span},
};

pub trait ServiceCmd<A, T, R>: Sized
where
    A: Parser,
    R: RuntimeOperation<T>,
{
    fn params(args: &A) -> (T, Option<LogLevel>);

    fn run() {
        let code = A::try_parse()
            .map_err(|err| err.to_string())
            .map(|args| Self::params(&args))
            .and_then(|(params, log_level)| {
                R::new(params, log_level)
                    .and_then(|mut runtime| runtime.run())
                    .map(|_| libc::EXIT_SUCCESS)
                    .map_err(|err| err.to_string())
            })
            .unwrap_or_else(|msg| {
                eprintln!("{}", msg);
                libc::EXIT_FAILURE
            });

        std::process::exit(code)
    }
}

/// The way to address the unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnitTarget {
    /// The numeric identifier of sound card in Linux sound subsystem.
    Card(u32),
    /// The global unique identifier of node in IEEE 1394 bus.
    Guid(u64),
}

const GUID_DIGITS: usize = 16;

impl FromStr for UnitTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let literal = s.trim();
        let digits = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"));

        if let Some(digits) = digits {
            u64::from_str_radix(digits, 16)
                .map(Self::Guid)
                .map_err(|err| format!("Invalid GUID {}: {}", literal, err))
        } else if literal.len() == GUID_DIGITS {
            u64::from_str_radix(literal, 16)
                .map(Self::Guid)
                .map_err(|err| format!("Invalid GUID {}: {}", literal, err))
        } else {
            literal
                .parse::<u32>()
                .map(Self::Card)
                .map_err(|err| format!("Invalid card number {}: {}", literal, err))
        }
    }
}

/// The command and its arguments.
pub type UnitCommand = Vec<String>;

/// The parameters for runtime to operate the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitParams {
    pub target: UnitTarget,
    /// The file with one command per line, or the name of command.
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl UnitParams {
    pub fn commands(&self) -> Result<Vec<UnitCommand>, Error> {
        load_commands(self.command.as_deref(), &self.args)
    }
}

/// Load commands. The file includes one command per line, while the other string is the name of
/// command followed by the arguments.
pub fn load_commands(cmd: Option<&str>, args: &[String]) -> Result<Vec<UnitCommand>, Error> {
    match cmd {
        None => Ok(Vec::new()),
        Some(path) if Path::new(path).is_file() => {
            let content = std::fs::read_to_string(path).map_err(|err| {
                let msg = format!("Fail to read {}: {}", path, err);
                Error::new(ErrorKind::Io, &msg)
            })?;
            Ok(parse_commands(&content))
        }
        Some(name) => {
            let mut command = vec![name.to_string()];
            command.extend_from_slice(args);
            Ok(vec![command])
        }
    }
}

fn parse_commands(content: &str) -> Vec<UnitCommand> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split_whitespace().map(|s| s.to_string()).collect())
        .collect()
}

/// The operation for commands against unit.
pub trait UnitCommandOperation {
    /// The name and the usage of commands.
    const COMMANDS: &'static [(&'static str, &'static str)];

    /// Execute the command, then return the result in text if any.
    fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error>;

    /// The list of available commands.
    fn usage() -> String {
        let mut text = String::from("Available commands:\n");
        Self::COMMANDS.iter().for_each(|(name, usage)| {
            text.push_str(&format!("  {:<24} {}\n", name, usage));
        });
        text
    }

    /// Execute commands in order. The first error aborts the rest.
    fn execute_commands(&mut self, commands: &[UnitCommand]) -> Result<(), Error> {
        if commands.is_empty() {
            print!("{}", Self::usage());
            return Ok(());
        }

        commands.iter().try_for_each(|command| {
            let (name, args) = command
                .split_first()
                .ok_or_else(|| Error::new(ErrorKind::Argument, "Empty command"))?;

            if Self::COMMANDS.iter().find(|(n, _)| n == name).is_none() {
                let msg = format!("Unknown command: {}", name);
                Err(Error::new(ErrorKind::Argument, &msg))?;
            }

            let enter = debug_span!("command", name = name.as_str()).entered();
            let res = self.execute(name, args);
            debug!(?args, ?res);
            enter.exit();

            res.map(|output| {
                if let Some(text) = output {
                    println!("{}", text);
                }
            })
        })
    }
}

/// Retrieve the argument at the position.
pub fn command_arg<'a>(args: &'a [String], pos: usize, label: &str) -> Result<&'a str, Error> {
    args.get(pos).map(|arg| arg.as_str()).ok_or_else(|| {
        let msg = format!("Missing argument for {}", label);
        Error::new(ErrorKind::Argument, &msg)
    })
}

/// Parse the argument at the position.
pub fn parse_command_arg<T: FromStr>(args: &[String], pos: usize, label: &str) -> Result<T, Error> {
    let arg = command_arg(args, pos, label)?;
    arg.parse::<T>().map_err(|_| {
        let msg = format!("Invalid argument for {}: {}", label, arg);
        Error::new(ErrorKind::Argument, &msg)
    })
}

#[cfg(test)]
mod test {
    use {super::*, std::io::Write};

    #[test]
    fn unit_target() {
        assert_eq!(UnitTarget::from_str("1"), Ok(UnitTarget::Card(1)));
        assert_eq!(
            UnitTarget::from_str("0x0001f200001a5e7b"),
            Ok(UnitTarget::Guid(0x0001f200001a5e7b))
        );
        assert_eq!(
            UnitTarget::from_str("000a35009caf3c41"),
            Ok(UnitTarget::Guid(0x000a35009caf3c41))
        );
        assert!(UnitTarget::from_str("0xzz").is_err());
        assert!(UnitTarget::from_str("card").is_err());
    }

    #[test]
    fn commands_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"set-sampling-rate 48000\n\n# comment\nget-clock-source\n")
            .unwrap();

        let path = path.to_str().unwrap();
        let commands = load_commands(Some(path), &[]).unwrap();
        assert_eq!(
            commands,
            vec![
                vec!["set-sampling-rate".to_string(), "48000".to_string()],
                vec!["get-clock-source".to_string()],
            ]
        );
    }

    #[test]
    fn command_in_arguments() {
        let args = vec!["ADAT".to_string()];
        let commands = load_commands(Some("set-clock-source"), &args).unwrap();
        assert_eq!(
            commands,
            vec![vec!["set-clock-source".to_string(), "ADAT".to_string()]]
        );
        assert_eq!(load_commands(None, &[]).unwrap().len(), 0);
    }

    struct Counter(u32);

    impl UnitCommandOperation for Counter {
        const COMMANDS: &'static [(&'static str, &'static str)] =
            &[("add", "<value>"), ("get", "")];

        fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error> {
            match name {
                "add" => {
                    self.0 += parse_command_arg::<u32>(args, 0, "value")?;
                    Ok(None)
                }
                _ => Ok(Some(self.0.to_string())),
            }
        }
    }

    #[test]
    fn command_execution() {
        let mut counter = Counter(0);
        let commands = vec![
            vec!["add".to_string(), "3".to_string()],
            vec!["add".to_string(), "4".to_string()],
            vec!["get".to_string()],
        ];
        counter.execute_commands(&commands).unwrap();
        assert_eq!(counter.0, 7);

        let err = counter
            .execute_commands(&[vec!["sub".to_string()]])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);

        let err = counter
            .execute_commands(&[vec!["add".to_string(), "x".to_string()]])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(counter.0, 7);

        assert!(Counter::usage().contains("add"));
    }
}
