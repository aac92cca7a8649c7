// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2020 Takashi Sakamoto

use {
    clap::Parser,
    dice_runtime::DiceRuntime,
    runtime_core::{cmdline::*, LogLevel},
};

struct DiceServiceCmd;

#[derive(Parser)]
#[clap(name = "snd-dice-ctl-utils")]
struct Arguments {
    /// The numeric identifier of sound card in Linux sound subsystem, or the global unique
    /// identifier of node in 16 hexadecimal digits.
    target: UnitTarget,

    /// The name of command, or the path to file with one command per line. Available commands
    /// are listed when omitted.
    command: Option<String>,

    /// The arguments of command.
    #[clap(allow_hyphen_values = true, trailing_var_arg = true)]
    args: Vec<String>,

    /// The level to debug runtime, disabled as a default.
    #[clap(long, short, value_enum)]
    log_level: Option<LogLevel>,
}

impl ServiceCmd<Arguments, UnitParams, DiceRuntime> for DiceServiceCmd {
    fn params(args: &Arguments) -> (UnitParams, Option<LogLevel>) {
        let params = UnitParams {
            target: args.target,
            command: args.command.clone(),
            args: args.args.clone(),
        };
        (params, args.log_level)
    }
}

fn main() {
    DiceServiceCmd::run()
}
