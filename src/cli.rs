// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn input_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("transactions")
            .long("transactions")
            .short('t')
            .required(true)
            .help("Settlement ledger (.csv or .json)"),
    )
    .arg(
        Arg::new("costs")
            .long("costs")
            .short('c')
            .help("Product cost table (.csv or .json)"),
    )
    .arg(
        Arg::new("overrides")
            .long("overrides")
            .help("Manual product overrides (.csv or .json)"),
    )
    .arg(
        Arg::new("shipping")
            .long("shipping")
            .help("Shipping rate routes (.json)"),
    )
    .arg(
        Arg::new("countries")
            .long("countries")
            .help("Per-marketplace cost configuration (.json)"),
    )
}

fn scope_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("marketplace")
            .long("marketplace")
            .short('m')
            .help("Marketplace code, e.g. US, DE; omit to analyse all"),
    )
    .arg(
        Arg::new("fulfillment")
            .long("fulfillment")
            .value_parser(["all", "fba", "fbm"])
            .default_value("all"),
    )
    .arg(Arg::new("from").long("from").help("YYYY-MM-DD, inclusive"))
    .arg(Arg::new("to").long("to").help("YYYY-MM-DD, inclusive"))
    .arg(
        Arg::new("currency")
            .long("currency")
            .help("Reporting currency (defaults to the stored setting)"),
    )
    .arg(
        Arg::new("mixed-policy")
            .long("mixed-policy")
            .value_parser(["even", "weighted"])
            .default_value("even")
            .help("Cost split for SKUs sold through both FBA and FBM"),
    )
    .arg(
        Arg::new("top")
            .long("top")
            .value_parser(value_parser!(usize))
            .default_value("5")
            .help("Children sampled on each rollup"),
    )
}

fn level_arg(default: &'static str) -> Arg {
    Arg::new("level")
        .long("level")
        .value_parser(["sku", "product", "parent", "category"])
        .default_value(default)
}

fn output_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .conflicts_with("jsonl"),
    )
    .arg(Arg::new("jsonl").long("jsonl").action(ArgAction::SetTrue))
}

pub fn build_cli() -> Command {
    Command::new("marginlens")
        .version(crate_version!())
        .about("SKU profitability across marketplaces and currencies")
        .subcommand(Command::new("init").about("Create the local settings and FX store"))
        .subcommand(output_args(scope_args(input_args(
            Command::new("analyze")
                .about("Compute profitability and print one aggregation level")
                .arg(level_arg("product"))
                .arg(
                    Arg::new("summary")
                        .long("summary")
                        .action(ArgAction::SetTrue)
                        .help("Print only the report summary"),
                ),
        ))))
        .subcommand(scope_args(input_args(
            Command::new("export")
                .about("Write flat profitability records to a file")
                .arg(level_arg("sku"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .default_value("csv")
                        .help("csv|json"),
                )
                .arg(Arg::new("out").long("out").short('o').required(true)),
        )))
        .subcommand(
            Command::new("fx")
                .about("Exchange rates used for conversion")
                .subcommand(
                    Command::new("set-base")
                        .about("Set the reporting currency")
                        .arg(Arg::new("currency").required(true)),
                )
                .subcommand(Command::new("fetch").about("Refresh USD-based rates (Frankfurter/ECB)"))
                .subcommand(output_args(Command::new("list").about("Show the active rate table")))
                .subcommand(
                    Command::new("convert")
                        .about("Convert an amount with the active rate table")
                        .arg(Arg::new("amount").required(true))
                        .arg(Arg::new("from").required(true))
                        .arg(Arg::new("to").required(true)),
                ),
        )
        .subcommand(output_args(scope_args(input_args(
            Command::new("doctor").about("Report data-quality gaps that exclude SKUs"),
        ))))
}
