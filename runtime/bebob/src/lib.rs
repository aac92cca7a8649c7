// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto
mod unit;

pub use unit::{BebobUnit, PlugDescriptor};

use {
    firewire_bebob_protocols::bridgeco::*,
    firewire_protocols_core::*,
    runtime_core::{cmdline::*, hwdep::UnitType, node::LinuxNode, *},
    tracing::{debug, debug_span, Level},
};

pub struct BebobRuntime {
    unit: BebobUnit<LinuxNode>,
    commands: Vec<UnitCommand>,
}

impl RuntimeOperation<UnitParams> for BebobRuntime {
    fn new(params: UnitParams, log_level: Option<LogLevel>) -> Result<Self, Error> {
        if let Some(level) = log_level {
            let fmt_level = match level {
                LogLevel::Debug => Level::DEBUG,
            };
            tracing_subscriber::fmt().with_max_level(fmt_level).init();
        }

        let commands = params.commands()?;

        let enter = debug_span!("open").entered();
        let node = LinuxNode::open(&params.target, UnitType::Bebob)?;
        let unit = BebobUnit::new(node)?;
        debug!(name = unit.name());
        enter.exit();

        Ok(Self { unit, commands })
    }

    fn run(&mut self) -> Result<(), Error> {
        self.unit.execute_commands(&self.commands)
    }
}

fn parse_unit_plug_addr(args: &[String]) -> Result<BcoPlugAddr, Error> {
    let direction = match command_arg(args, 0, "direction of plug")? {
        "in" => BcoPlugDirection::Input,
        "out" => BcoPlugDirection::Output,
        arg => {
            let msg = format!("Invalid direction of plug: {}", arg);
            Err(Error::new(ErrorKind::Argument, &msg))?
        }
    };
    let plug_type = match command_arg(args, 1, "type of plug")? {
        "isoc" => BcoPlugAddrUnitType::Isoc,
        "ext" => BcoPlugAddrUnitType::Ext,
        "async" => BcoPlugAddrUnitType::Async,
        arg => {
            let msg = format!("Invalid type of plug: {}", arg);
            Err(Error::new(ErrorKind::Argument, &msg))?
        }
    };
    let plug_id = parse_command_arg::<u8>(args, 2, "plug id")?;
    Ok(BcoPlugAddr::new_for_unit(direction, plug_type, plug_id))
}

fn io_plug_addr_to_string(addr: &BcoIoPlugAddr) -> String {
    let direction = match addr.direction {
        BcoPlugDirection::Input => "in",
        BcoPlugDirection::Output => "out",
    };
    let mode = match addr.mode {
        BcoPlugAddrMode::Unit { plug_type, plug_id } => {
            format!("unit {:?} {}", plug_type, plug_id)
        }
        BcoPlugAddrMode::Subunit {
            subunit_id,
            plug_id,
        } => format!("subunit {} {}", subunit_id, plug_id),
        BcoPlugAddrMode::FuncBlk {
            func_blk_type,
            func_blk_id,
            plug_id,
        } => format!(
            "function-block 0x{:02x} {} {}",
            func_blk_type, func_blk_id, plug_id
        ),
    };
    match addr.subunit {
        Some((subunit_type, subunit_id)) => format!(
            "{} 0x{:02x}:{} {}",
            direction, subunit_type, subunit_id, mode
        ),
        None => format!("{} {}", direction, mode),
    }
}

fn plug_descriptor_to_string(desc: &PlugDescriptor) -> String {
    let mut lines = vec![
        format!("type: {:?}", desc.plug_type),
        format!("name: {}", desc.name),
        format!("channels: {}", desc.ch_count),
    ];
    desc.clusters
        .iter()
        .zip(&desc.cluster_infos)
        .for_each(|(cluster, info)| {
            let entries: Vec<String> = cluster
                .entries
                .iter()
                .map(|entry| format!("{}:{:?}", entry.pos, entry.loc))
                .collect();
            lines.push(format!(
                "cluster {}: {:?} \"{}\" {}",
                info.index,
                info.port_type,
                info.name,
                entries.join(" ")
            ));
        });
    lines.join("\n")
}

impl<T: BusTransport> UnitCommandOperation for BebobUnit<T> {
    const COMMANDS: &'static [(&'static str, &'static str)] = &[
        ("get-model-name", ""),
        ("get-supported-sampling-rates", ""),
        ("get-sampling-rate", ""),
        ("set-sampling-rate", "<RATE>"),
        ("get-plug-info", "<in|out> <isoc|ext|async> <ID>"),
        ("get-plug-ch-name", "<in|out> <isoc|ext|async> <ID> <POS>"),
        ("get-plug-input", "<in|out> <isoc|ext|async> <ID>"),
        ("get-plug-outputs", "<in|out> <isoc|ext|async> <ID>"),
    ];

    fn execute(&mut self, name: &str, args: &[String]) -> Result<Option<String>, Error> {
        match name {
            "get-model-name" => Ok(Some(self.name().to_string())),
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
            "get-plug-info" => {
                let addr = parse_unit_plug_addr(args)?;
                self.plug_descriptor(&addr)
                    .map(|desc| Some(plug_descriptor_to_string(&desc)))
            }
            "get-plug-ch-name" => {
                let addr = parse_unit_plug_addr(args)?;
                let pos = parse_command_arg::<u8>(args, 3, "position of channel")?;
                self.plug_ch_name(&addr, pos).map(Some)
            }
            "get-plug-input" => {
                let addr = parse_unit_plug_addr(args)?;
                self.plug_input(&addr)
                    .map(|input| Some(io_plug_addr_to_string(&input)))
            }
            "get-plug-outputs" => {
                let addr = parse_unit_plug_addr(args)?;
                self.plug_outputs(&addr).map(|outputs| {
                    let labels: Vec<String> = outputs.iter().map(io_plug_addr_to_string).collect();
                    Some(labels.join("\n"))
                })
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
    fn plug_addr_arguments() {
        let addr = parse_unit_plug_addr(&command("out ext 3")).unwrap();
        assert_eq!(addr.to_raw(), [0x01, 0x00, 0x01, 0x03, 0xff]);

        let err = parse_unit_plug_addr(&command("both isoc 0")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        let err = parse_unit_plug_addr(&command("in isoc 256")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn io_plug_addr_labels() {
        let addr = BcoIoPlugAddr {
            direction: BcoPlugDirection::Input,
            subunit: Some((0x08, 0x00)),
            mode: BcoPlugAddrMode::Subunit {
                subunit_id: 0x00,
                plug_id: 0x01,
            },
        };
        assert_eq!(io_plug_addr_to_string(&addr), "in 0x08:0 subunit 0 1");

        let addr = BcoIoPlugAddr {
            direction: BcoPlugDirection::Output,
            subunit: None,
            mode: BcoPlugAddrMode::Unit {
                plug_type: BcoPlugAddrUnitType::Ext,
                plug_id: 2,
            },
        };
        assert_eq!(io_plug_addr_to_string(&addr), "out unit Ext 2");
    }

    #[test]
    fn command_table() {
        let node = MockNode::new(3, 0x000ff20000000001);
        node.set_config_rom(&unit_config_rom(0x000ff2, 0x00a02d, 0x010001, 0x010062));
        let mut unit = BebobUnit::new(node).unwrap();

        unit.node()
            .queue_fcp_response(&[0x09, 0xff, 0x18, 0x00, 0x90, 0x02, 0xff, 0xff]);
        unit.node()
            .queue_fcp_response(&[0x09, 0xff, 0x19, 0x00, 0x90, 0x02, 0xff, 0xff]);
        unit.execute_commands(&[command("set-sampling-rate 48000")])
            .unwrap();

        unit.node()
            .queue_fcp_response(&[0x0c, 0xff, 0x18, 0x00, 0x90, 0x02, 0xff, 0xff]);
        assert_eq!(
            unit.execute("get-sampling-rate", &[]).unwrap(),
            Some("48000".to_string())
        );

        unit.node().queue_fcp_response(&[
            0x0c, 0xff, 0x02, 0xc0, 0x00, 0x00, 0x01, 0x00, 0xff, 0x06, 0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0xff, 0xff,
        ]);
        assert_eq!(
            unit.execute("get-plug-outputs", &command("in ext 0"))
                .unwrap(),
            Some("in unit Isoc 0".to_string())
        );

        let err = unit
            .execute_commands(&[command("set-sampling-rate 22050")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
