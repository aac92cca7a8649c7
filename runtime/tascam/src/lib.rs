// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2021 Takashi Sakamoto
mod unit;

pub use unit::{rack_cache_path, TscmUnit};

use {
    firewire_protocols_core::*,
    firewire_tascam_protocols::*,
    runtime_core::{cmdline::*, hwdep::UnitType, node::LinuxNode, *},
    tracing::{debug, debug_span, Level},
    unit::*,
};

pub struct TscmRuntime {
    unit: TscmUnit<LinuxNode>,
    commands: Vec<UnitCommand>,
}

impl RuntimeOperation<UnitParams> for TscmRuntime {
    fn new(params: UnitParams, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        let commands = params.commands()?;

        let enter = debug_span!("open").entered();
        let node = LinuxNode::open(&params.target, UnitType::Tascam)?;
        let unit = TscmUnit::new(node)?;
        debug!(model = unit.model().name());
        enter.exit();

        Ok(Self { unit, commands })
    }

    fn run(&mut self) -> Result<(), Error> {
        self.unit.execute_commands(&self.commands)
    }
}

fn parse_switch(args: &[String], pos: usize, label: &str) -> Result<bool, Error> {
    match command_arg(args, pos, label)? {
        "on" => Ok(true),
        "off" => Ok(false),
        arg => {
            let msg = format!("Invalid argument for {}: {}", label, arg);
            Err(Error::new(ErrorKind::Argument, &msg))
        }
    }
}

fn switch_to_str(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

impl<T: BusTransport> UnitCommandOperation for TscmUnit<T> {
    const COMMANDS: &'static [(&'static str, &'static str)] = &[
        ("get-model-name", ""),
        ("get-hardware-information", ""),
        ("get-supported-sampling-rates", ""),
        ("get-sampling-rate", ""),
        ("set-sampling-rate", "<44100|48000|88200|96000>"),
        ("get-supported-clock-sources", ""),
        ("get-clock-source", ""),
        ("set-clock-source", "<Internal|Word-clock|S/PDIF|ADAT>"),
        ("get-input-threshold", ""),
        ("set-input-threshold", "<DB|-inf>"),
        ("get-spdif-capture-source", ""),
        ("set-spdif-capture-source", "<coaxial|optical>"),
        ("get-coaxial-output-source", ""),
        ("set-coaxial-output-source", "<stream-input|analog-output-1/2>"),
        ("get-supported-opt-output-sources", ""),
        ("get-opt-output-source", ""),
        (
            "set-opt-output-source",
            "<stream-input|coaxial-output-1/2|analog-input-1/2|analog-output>",
        ),
        ("set-led", "<POSITION> <on|off>"),
        ("get-lit-leds", ""),
        ("get-master-fader-assign", ""),
        ("set-master-fader-assign", "<on|off>"),
        ("get-input-gain", "<CHANNEL>"),
        ("set-input-gain", "<CHANNEL> <0..99>"),
        ("get-input-balance", "<CHANNEL>"),
        ("set-input-balance", "<CHANNEL> <0..99>"),
        ("get-input-mute", "<CHANNEL>"),
        ("set-input-mute", "<CHANNEL> <on|off>"),
        ("set-firewire-led", "<on|off>"),
    ];

    fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error> {
        match name {
            "get-model-name" => Ok(Some(self.model().name().to_string())),
            "get-hardware-information" => self.hardware_information().map(|info| {
                Some(format!(
                    "register: 0x{:08x}, fpga: 0x{:08x}, arm: 0x{:08x}, hardware: 0x{:08x}",
                    info.register, info.fpga, info.arm, info.hardware
                ))
            }),
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
            "get-supported-clock-sources" => {
                let labels: Vec<&str> = self
                    .supported_clock_sources()
                    .iter()
                    .map(|src| src.label())
                    .collect();
                Ok(Some(labels.join(" ")))
            }
            "get-clock-source" => self
                .get_clock_source()
                .map(|src| Some(src.label().to_string())),
            "set-clock-source" => {
                let src = command_arg(args, 0, "clock source").and_then(ClkSrc::from_label)?;
                self.set_clock_source(src).map(|_| None)
            }
            "get-input-threshold" => self
                .get_input_threshold()
                .map(|db| Some(format!("{:.3}", db))),
            "set-input-threshold" => {
                let db = parse_command_arg::<f64>(args, 0, "threshold")?;
                self.set_input_threshold(db).map(|_| None)
            }
            "get-spdif-capture-source" => self
                .get_spdif_capture_source()
                .map(|src| Some(spdif_capture_source_to_str(&src).to_string())),
            "set-spdif-capture-source" => {
                let src = command_arg(args, 0, "source of S/PDIF input")
                    .and_then(str_to_spdif_capture_source)?;
                self.set_spdif_capture_source(src).map(|_| None)
            }
            "get-coaxial-output-source" => self
                .get_coaxial_output_source()
                .map(|src| Some(coaxial_output_source_to_str(&src).to_string())),
            "set-coaxial-output-source" => {
                let src = command_arg(args, 0, "source of coaxial output")
                    .and_then(str_to_coaxial_output_source)?;
                self.set_coaxial_output_source(src).map(|_| None)
            }
            "get-supported-opt-output-sources" => {
                let labels: Vec<&str> = self
                    .supported_opt_output_sources()
                    .iter()
                    .map(optical_output_source_to_str)
                    .collect();
                Ok(Some(labels.join(" ")))
            }
            "get-opt-output-source" => self
                .get_opt_output_source()
                .map(|src| Some(optical_output_source_to_str(&src).to_string())),
            "set-opt-output-source" => {
                let src = command_arg(args, 0, "source of optical output")
                    .and_then(str_to_optical_output_source)?;
                self.set_opt_output_source(src).map(|_| None)
            }
            "set-led" => {
                let pos = parse_command_arg::<u16>(args, 0, "position of LED")?;
                let enable = parse_switch(args, 1, "state of LED")?;
                self.operate_led(pos, enable).map(|_| None)
            }
            "get-lit-leds" => self.lit_leds().map(|leds| {
                let labels: Vec<String> = leds.iter().map(|pos| pos.to_string()).collect();
                Some(labels.join(" "))
            }),
            "get-master-fader-assign" => self
                .get_master_fader_assign()
                .map(|assign| Some(switch_to_str(assign).to_string())),
            "set-master-fader-assign" => {
                let assign = parse_switch(args, 0, "master fader assignment")?;
                self.set_master_fader_assign(assign).map(|_| None)
            }
            "get-input-gain" => {
                let ch = command_arg(args, 0, "input channel")?;
                self.get_input_gain(ch).map(|gain| Some(gain.to_string()))
            }
            "set-input-gain" => {
                let ch = command_arg(args, 0, "input channel")?;
                let gain = parse_command_arg::<u32>(args, 1, "gain")?;
                self.set_input_gain(ch, gain).map(|_| None)
            }
            "get-input-balance" => {
                let ch = command_arg(args, 0, "input channel")?;
                self.get_input_balance(ch)
                    .map(|balance| Some(balance.to_string()))
            }
            "set-input-balance" => {
                let ch = command_arg(args, 0, "input channel")?;
                let balance = parse_command_arg::<u32>(args, 1, "balance")?;
                self.set_input_balance(ch, balance).map(|_| None)
            }
            "get-input-mute" => {
                let ch = command_arg(args, 0, "input channel")?;
                self.get_input_mute(ch)
                    .map(|mute| Some(switch_to_str(mute).to_string()))
            }
            "set-input-mute" => {
                let ch = command_arg(args, 0, "input channel")?;
                let mute = parse_switch(args, 1, "mute")?;
                self.set_input_mute(ch, mute).map(|_| None)
            }
            "set-firewire-led" => {
                let enable = parse_switch(args, 0, "state of LED")?;
                self.operate_firewire_led(enable).map(|_| None)
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
        let dir = tempfile::tempdir().unwrap();
        let node = MockNode::new(6, 0x00022e0000001804);
        node.set_config_rom(&unit_config_rom(0x00022e, 0x00022e, 0x800004, 0x000002));
        // The zero fields leave the current configuration.
        node.set_write_hook(0xffff00000228, |old, val| {
            let mut frame = old.to_be_bytes();
            val.to_be_bytes()
                .iter()
                .enumerate()
                .filter(|(_, &b)| b > 0)
                .for_each(|(i, &b)| frame[i] = b);
            u32::from_be_bytes(frame)
        });
        let mut unit = TscmUnit::with_cache_path(node, dir.path().join("cache")).unwrap();

        let commands = vec![
            command("set-sampling-rate 48000"),
            command("set-clock-source ADAT"),
            command("set-input-mute S/PDIF-1 on"),
            command("set-input-balance S/PDIF-1 25"),
        ];
        unit.execute_commands(&commands).unwrap();
        assert_eq!(unit.get_sampling_rate().unwrap(), 48000);
        assert_eq!(unit.get_clock_source().unwrap(), ClkSrc::Adat);
        assert_eq!(
            unit.execute("get-input-mute", &command("S/PDIF-1")).unwrap(),
            Some("on".to_string())
        );
        assert_eq!(
            unit.execute("get-input-balance", &command("S/PDIF-1"))
                .unwrap(),
            Some("25".to_string())
        );

        let err = unit
            .execute_commands(&[command("set-clock-source Word-on-BNC")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = unit
            .execute_commands(&[command("set-led 16 on")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }
}
