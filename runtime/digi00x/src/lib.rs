// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto
mod unit;

pub use unit::Dg00xUnit;

use {
    firewire_digi00x_protocols::*,
    firewire_protocols_core::*,
    runtime_core::{cmdline::*, hwdep::UnitType, node::LinuxNode, *},
    tracing::{debug, debug_span, Level},
    unit::*,
};

pub struct Dg00xRuntime {
    unit: Dg00xUnit<LinuxNode>,
    commands: Vec<UnitCommand>,
}

impl RuntimeOperation<UnitParams> for Dg00xRuntime {
    fn new(params: UnitParams, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        let commands = params.commands()?;

        let enter = debug_span!("open").entered();
        let node = LinuxNode::open(&params.target, UnitType::Digi00x)?;
        let unit = Dg00xUnit::new(node)?;
        debug!(model = unit.model().name());
        enter.exit();

        Ok(Self { unit, commands })
    }

    fn run(&mut self) -> Result<(), Error> {
        self.unit.execute_commands(&self.commands)
    }
}

fn parse_clock_rate(args: &[String]) -> Result<ClockRate, Error> {
    parse_command_arg::<u32>(args, 0, "sampling rate").and_then(ClockRate::from_frequency)
}

fn parse_mixer_target(args: &[String]) -> Result<(Dg003MixerSource, usize), Error> {
    let src = command_arg(args, 0, "source").and_then(str_to_mixer_source)?;
    let dst = parse_command_arg::<usize>(args, 1, "destination channel")?;
    Ok((src, dst))
}

impl<T: BusTransport> UnitCommandOperation for Dg00xUnit<T> {
    const COMMANDS: &'static [(&'static str, &'static str)] = &[
        ("get-model-name", ""),
        ("get-supported-sampling-rates", ""),
        ("get-sampling-rate", ""),
        ("set-sampling-rate", "<44100|48000|88200|96000>"),
        ("get-external-sampling-rate", ""),
        ("get-supported-clock-sources", ""),
        ("get-clock-source", ""),
        ("set-clock-source", "<Internal|S/PDIF|ADAT|Word-clock>"),
        ("get-opt-iface-mode", ""),
        ("set-opt-iface-mode", "<ADAT|S/PDIF>"),
        ("get-mixer-mode", ""),
        ("set-mixer-mode", "<on|off>"),
        ("get-mixer-src-gain", "<SOURCE> <0|1>"),
        ("set-mixer-src-gain", "<SOURCE> <0|1> <DB|-inf>"),
        ("get-mixer-src-balance", "<SOURCE> <0|1>"),
        ("set-mixer-src-balance", "<SOURCE> <0|1> <0..100|-inf>"),
    ];

    fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error> {
        match name {
            "get-model-name" => Ok(Some(self.model().name().to_string())),
            "get-supported-sampling-rates" => {
                let labels: Vec<&str> = self
                    .supported_sampling_rates()
                    .iter()
                    .map(clock_rate_to_str)
                    .collect();
                Ok(Some(labels.join(" ")))
            }
            "get-sampling-rate" => self
                .get_sampling_rate()
                .map(|rate| Some(clock_rate_to_str(&rate).to_string())),
            "set-sampling-rate" => {
                let rate = parse_clock_rate(args)?;
                self.set_sampling_rate(rate).map(|_| None)
            }
            "get-external-sampling-rate" => self.get_external_sampling_rate().map(|rate| {
                let label = rate.as_ref().map(clock_rate_to_str).unwrap_or("N/A");
                Some(label.to_string())
            }),
            "get-supported-clock-sources" => {
                let labels: Vec<&str> = self
                    .supported_clock_sources()
                    .iter()
                    .map(clock_source_to_str)
                    .collect();
                Ok(Some(labels.join(" ")))
            }
            "get-clock-source" => self
                .get_clock_source()
                .map(|src| Some(clock_source_to_str(&src).to_string())),
            "set-clock-source" => {
                let src = command_arg(args, 0, "clock source").and_then(str_to_clock_source)?;
                self.set_clock_source(src).map(|_| None)
            }
            "get-opt-iface-mode" => self
                .get_opt_iface_mode()
                .map(|mode| Some(optical_interface_mode_to_str(&mode).to_string())),
            "set-opt-iface-mode" => {
                let mode = command_arg(args, 0, "mode of optical interface")
                    .and_then(str_to_optical_interface_mode)?;
                self.set_opt_iface_mode(mode).map(|_| None)
            }
            "get-mixer-mode" => self
                .get_mixer_mode()
                .map(|enabled| Some(if enabled { "on" } else { "off" }.to_string())),
            "set-mixer-mode" => {
                let enabled = match command_arg(args, 0, "mixer mode")? {
                    "on" => true,
                    "off" => false,
                    arg => {
                        let msg = format!("Invalid argument for mixer mode: {}", arg);
                        Err(Error::new(ErrorKind::Argument, &msg))?
                    }
                };
                self.set_mixer_mode(enabled).map(|_| None)
            }
            "get-mixer-src-gain" => {
                let (src, dst) = parse_mixer_target(args)?;
                self.get_mixer_src_gain(src, dst)
                    .map(|db| Some(format!("{:.3}", db)))
            }
            "set-mixer-src-gain" => {
                let (src, dst) = parse_mixer_target(args)?;
                let db = parse_command_arg::<f64>(args, 2, "gain")?;
                self.set_mixer_src_gain(src, dst, db).map(|_| None)
            }
            "get-mixer-src-balance" => {
                let (src, dst) = parse_mixer_target(args)?;
                self.get_mixer_src_balance(src, dst)
                    .map(|balance| Some(format!("{:.1}", balance)))
            }
            "set-mixer-src-balance" => {
                let (src, dst) = parse_mixer_target(args)?;
                let balance = parse_command_arg::<f64>(args, 2, "balance")?;
                self.set_mixer_src_balance(src, dst, balance).map(|_| None)
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
        let node = MockNode::new(5, 0);
        node.set_config_rom(&unit_config_rom(0x00a07e, 0x0000aa, 0x000001, 0x000001));
        let mut unit = Dg00xUnit::new(node).unwrap();

        let commands = vec![
            command("set-sampling-rate 88200"),
            command("set-clock-source Word-clock"),
            command("set-mixer-src-gain S/PDIF-1/2 0 -inf"),
        ];
        unit.execute_commands(&commands).unwrap();
        assert_eq!(unit.get_sampling_rate().unwrap(), ClockRate::R88200);
        assert_eq!(unit.get_clock_source().unwrap(), ClockSource::WordClock);
        assert_eq!(
            unit.execute("get-mixer-src-balance", &command("S/PDIF-1/2 0"))
                .unwrap(),
            Some("-inf".to_string())
        );

        let err = unit
            .execute_commands(&[command("set-sampling-rate 32000")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = unit
            .execute_commands(&[command("set-clock-source MIDI")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
