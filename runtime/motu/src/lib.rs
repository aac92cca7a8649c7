// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto
mod unit;

pub use unit::MotuUnit;

use {
    firewire_motu_protocols::*,
    firewire_protocols_core::*,
    runtime_core::{cmdline::*, hwdep::UnitType, node::LinuxNode, *},
    tracing::{debug, debug_span, Level},
};

pub struct MotuRuntime {
    unit: MotuUnit<LinuxNode>,
    commands: Vec<UnitCommand>,
}

impl RuntimeOperation<UnitParams> for MotuRuntime {
    fn new(params: UnitParams, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        let commands = params.commands()?;

        let enter = debug_span!("open").entered();
        let node = LinuxNode::open(&params.target, UnitType::Motu)?;
        let unit = MotuUnit::new(node)?;
        debug!(model = unit.model().name());
        enter.exit();

        Ok(Self { unit, commands })
    }

    fn run(&mut self) -> Result<(), Error> {
        self.unit.execute_commands(&self.commands)
    }
}

fn parse_opt_iface(args: &[String]) -> Result<(OptIfaceDirection, OptIfaceIndex), Error> {
    let direction = command_arg(args, 0, "direction").and_then(OptIfaceDirection::from_label)?;
    let index = command_arg(args, 1, "optical interface").and_then(OptIfaceIndex::from_label)?;
    Ok((direction, index))
}

fn join_labels<'a, I: Iterator<Item = &'a str>>(labels: I) -> String {
    labels.collect::<Vec<&str>>().join(" ")
}

impl<T: BusTransport> UnitCommandOperation for MotuUnit<T> {
    const COMMANDS: &'static [(&'static str, &'static str)] = &[
        ("get-model-name", ""),
        ("get-supported-sampling-rates", ""),
        ("get-sampling-rate", ""),
        ("set-sampling-rate", "<RATE>"),
        ("get-supported-clock-sources", ""),
        ("get-clock-source", ""),
        ("set-clock-source", "<SOURCE>"),
        ("get-supported-opt-iface-modes", ""),
        ("get-supported-opt-iface-directions", ""),
        ("get-supported-opt-iface-indexes", ""),
        ("get-opt-iface-mode", "<in|out> <A|B>"),
        ("set-opt-iface-mode", "<in|out> <A|B> <None|S/PDIF|ADAT>"),
    ];

    fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error> {
        match name {
            "get-model-name" => Ok(Some(self.model().name().to_string())),
            "get-supported-sampling-rates" => {
                let labels: Vec<String> = self
                    .supported_sampling_rates()
                    .iter()
                    .map(|rate| rate.to_string())
                    .collect();
                Ok(Some(labels.join(" ")))
            }
            "get-sampling-rate" => self.get_sampling_rate().map(|rate| Some(rate.to_string())),
            "set-sampling-rate" => {
                let rate = parse_command_arg::<u32>(args, 0, "sampling rate")?;
                self.set_sampling_rate(rate).map(|_| None)
            }
            "get-supported-clock-sources" => self
                .supported_clock_sources()
                .map(|srcs| Some(join_labels(srcs.iter().map(|src| src.label())))),
            "get-clock-source" => self
                .get_clock_source()
                .map(|src| Some(src.label().to_string())),
            "set-clock-source" => {
                let src =
                    command_arg(args, 0, "clock source").and_then(MotuClockSource::from_label)?;
                self.set_clock_source(src).map(|_| None)
            }
            "get-supported-opt-iface-modes" => Ok(Some(join_labels(
                self.supported_opt_iface_modes().iter().map(|m| m.label()),
            ))),
            "get-supported-opt-iface-directions" => Ok(Some(join_labels(
                self.supported_opt_iface_directions()
                    .iter()
                    .map(|d| d.label()),
            ))),
            "get-supported-opt-iface-indexes" => Ok(Some(join_labels(
                self.supported_opt_iface_indexes().iter().map(|i| i.label()),
            ))),
            "get-opt-iface-mode" => {
                let (direction, index) = parse_opt_iface(args)?;
                self.get_opt_iface_mode(direction, index)
                    .map(|mode| Some(mode.label().to_string()))
            }
            "set-opt-iface-mode" => {
                let (direction, index) = parse_opt_iface(args)?;
                let mode = command_arg(args, 2, "mode of optical interface")
                    .and_then(OptIfaceMode::from_label)?;
                self.set_opt_iface_mode(direction, index, mode)
                    .map(|_| None)
            }
            _ => {
                let msg = format!("Unknown command: {}", name);
                Err(Error::new(ErrorKind::Argument, &msg))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use {super::*, firewire_protocols_core::mock::*};

    fn command(line: &str) -> UnitCommand {
        line.split_whitespace().map(|s| s.to_string()).collect()
    }

    #[test]
    fn command_table() {
        let node = MockNode::new(7, 0x0001f20000000002);
        node.set_config_rom(&unit_config_rom(0x0001f2, 0x0001f2, 0x000003, 0x101800));
        let mut unit = MotuUnit::new(node).unwrap();

        let commands = vec![
            command("set-sampling-rate 88200"),
            command("set-opt-iface-mode in A ADAT"),
            command("set-clock-source ADAT-on-opt"),
        ];
        unit.execute_commands(&commands).unwrap();
        assert_eq!(unit.get_sampling_rate().unwrap(), 88200);
        assert_eq!(
            unit.execute("get-clock-source", &[]).unwrap(),
            Some("ADAT-on-opt".to_string())
        );
        assert_eq!(
            unit.execute("get-opt-iface-mode", &command("in A")).unwrap(),
            Some("ADAT".to_string())
        );

        let err = unit
            .execute_commands(&[command("set-clock-source S/PDIF-on-opt")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = unit
            .execute_commands(&[command("set-opt-iface-mode in B ADAT")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
