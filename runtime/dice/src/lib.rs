// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto
mod unit;

pub use unit::DiceUnit;

use {
    firewire_dice_protocols::tcat::{global_section::*, *},
    firewire_protocols_core::*,
    runtime_core::{cmdline::*, hwdep::UnitType, node::LinuxNode, *},
    tracing::{debug, debug_span, Level},
};

pub struct DiceRuntime {
    unit: DiceUnit<LinuxNode>,
    commands: Vec<UnitCommand>,
}

impl RuntimeOperation<UnitParams> for DiceRuntime {
    fn new(params: UnitParams, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        let commands = params.commands()?;

        let enter = debug_span!("open").entered();
        let node = LinuxNode::open(&params.target, UnitType::Dice)?;
        let unit = DiceUnit::new(node)?;
        debug!(name = unit.name());
        enter.exit();

        Ok(Self { unit, commands })
    }

    fn run(&mut self) -> Result<(), Error> {
        self.unit.execute_commands(&self.commands)
    }
}

const NOTIFICATION_LABELS: &[(u32, &str)] = &[
    (NOTIFY_RX_CFG_CHG, "rx-config-changed"),
    (NOTIFY_TX_CFG_CHG, "tx-config-changed"),
    (NOTIFY_LOCK_CHG, "lock-changed"),
    (NOTIFY_CLOCK_ACCEPTED, "clock-accepted"),
    (NOTIFY_EXT_STATUS, "ext-status-changed"),
];

fn notification_to_string(bits: u32) -> String {
    let labels: Vec<&str> = NOTIFICATION_LABELS
        .iter()
        .filter(|(mask, _)| bits & mask > 0)
        .map(|(_, label)| *label)
        .collect();
    format!("0x{:08x} {}", bits, labels.join(" "))
        .trim_end()
        .to_string()
}

impl<T: BusTransport> UnitCommandOperation for DiceUnit<T> {
    const COMMANDS: &'static [(&'static str, &'static str)] = &[
        ("get-model-name", ""),
        ("get-nickname", ""),
        ("set-nickname", "<NAME>"),
        ("get-supported-sampling-rates", ""),
        ("get-sampling-rate", ""),
        ("set-sampling-rate", "<RATE>"),
        ("get-supported-clock-sources", ""),
        ("get-clock-source", ""),
        ("set-clock-source", "<SOURCE>"),
        ("get-clock-status", ""),
        ("get-latest-notification", ""),
        ("get-router-sources", ""),
        ("get-router-destinations", ""),
    ];

    fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error> {
        match name {
            "get-model-name" => Ok(Some(self.name().to_string())),
            "get-nickname" => self.get_nickname().map(Some),
            "set-nickname" => {
                let nickname = command_arg(args, 0, "nickname")?;
                self.set_nickname(nickname).map(|_| None)
            }
            "get-supported-sampling-rates" => self.supported_sampling_rates().map(|rates| {
                let labels: Vec<String> = rates.iter().map(|r| r.to_string()).collect();
                Some(labels.join(" "))
            }),
            "get-sampling-rate" => self.get_sampling_rate().map(|r| Some(r.to_string())),
            "set-sampling-rate" => {
                let rate = parse_command_arg::<u32>(args, 0, "sampling rate")
                    .and_then(ClockRate::from_frequency)?;
                self.set_sampling_rate(rate).map(|_| None)
            }
            "get-supported-clock-sources" => self.supported_clock_sources().map(|srcs| {
                let labels: Vec<String> = srcs.iter().map(|s| s.to_string()).collect();
                Some(labels.join(" "))
            }),
            "get-clock-source" => self.get_clock_source().map(|s| Some(s.to_string())),
            "set-clock-source" => {
                let src = command_arg(args, 0, "clock source").and_then(ClockSource::from_label)?;
                self.set_clock_source(src).map(|_| None)
            }
            "get-clock-status" => self.get_clock_status().map(|status| {
                let locked = if status.src_is_locked {
                    "locked"
                } else {
                    "unlocked"
                };
                Some(format!("{} {}", locked, status.rate))
            }),
            "get-latest-notification" => self
                .get_latest_notification()
                .map(|bits| Some(notification_to_string(bits))),
            "get-router-sources" => self
                .router_ports()
                .map(|ports| Some(ports.src_labels.join(" "))),
            "get-router-destinations" => self
                .router_ports()
                .map(|ports| Some(ports.dst_labels.join(" "))),
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
    fn notification_labels() {
        assert_eq!(
            notification_to_string(NOTIFY_LOCK_CHG | NOTIFY_CLOCK_ACCEPTED),
            "0x00000030 lock-changed clock-accepted"
        );
        assert_eq!(notification_to_string(0), "0x00000000");
    }

    #[test]
    fn command_table() {
        let node = MockNode::new(1, 0);
        node.set_config_rom(&unit_config_rom(0x00130e, 0x00130e, 0x000001, 0x000007));
        node.set_block(
            0xffffe0000000,
            &[
                0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x5f, 0x00, 0x00, 0x00, 0x69, 0x00, 0x00,
                0x00, 0x8e, 0x00, 0x00, 0x00, 0xf7, 0x00, 0x00, 0x01, 0x1a, 0x00, 0x00, 0x02, 0x11,
                0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            ],
        );
        node.set_quadlet(0xffffe0000028 + 0x64, 0x1081007e);
        node.set_quadlet(0xffffe0000028 + 0x4c, 0x0000020c);
        node.queue_notification(NOTIFY_CLOCK_ACCEPTED);
        node.queue_notification(NOTIFY_CLOCK_ACCEPTED);
        let mut unit = DiceUnit::new(node).unwrap();

        let commands = vec![
            command("set-sampling-rate 192000"),
            command("set-clock-source Word-clock"),
        ];
        unit.execute_commands(&commands).unwrap();
        assert_eq!(
            unit.execute("get-sampling-rate", &[]).unwrap(),
            Some("192000".to_string())
        );
        assert_eq!(
            unit.execute("get-clock-source", &[]).unwrap(),
            Some("Word-clock".to_string())
        );
        assert_eq!(
            unit.execute("get-model-name", &[]).unwrap(),
            Some("Saffire Pro 24".to_string())
        );

        let err = unit
            .execute_commands(&[command("set-sampling-rate 22050")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = unit
            .execute_commands(&[command("set-clock-source Stream-1")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
