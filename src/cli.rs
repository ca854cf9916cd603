use std::io::IsTerminal;

use clap::{Parser, Subcommand, ValueEnum};

use crate::{generate, graph, preview};

#[derive(Parser, Debug)]
#[command(rename_all = "kebab-case", version, about)]
pub struct Opts {
    #[command(flatten)]
    pub root: RootOpts,

    #[command(subcommand)]
    pub sub_command: SubCommand,
}

impl Opts {
    pub fn get_matches() -> Result<Self, clap::Error> {
        Self::try_parse()
    }

    pub const fn log_level(&self) -> &'static str {
        match self.root.quiet {
            0 => match self.root.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            },
            1 => "warn",
            2 => "error",
            _ => "off",
        }
    }
}

#[derive(Parser, Debug)]
#[command(rename_all = "kebab-case")]
pub struct RootOpts {
    /// Enable more detailed internal logging. Repeat to increase level.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce detail of internal logging. Repeat to reduce further.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Set the logging format
    #[arg(long, default_value = "text", env = "FORWARDER_CONF_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Control when ANSI terminal formatting is used.
    ///
    /// By default, formatting is only used when stderr is a terminal.
    #[arg(long, default_value = "auto", env = "FORWARDER_CONF_COLOR", global = true)]
    pub color: Color,
}

impl RootOpts {
    pub fn use_color(&self) -> bool {
        match self.color {
            Color::Always => true,
            Color::Never => false,
            Color::Auto => std::io::stderr().is_terminal(),
        }
    }
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum SubCommand {
    /// Compile a forwarder spec into a vector configuration document.
    Compile(generate::Opts),

    /// Output the compiled pipeline graph in DOT format, which can be
    /// rendered by GraphViz.
    Graph(graph::Opts),

    /// Run sample records through the OTLP stages and print the payload.
    Preview(preview::Opts),
}

impl SubCommand {
    pub fn execute(&self) -> exitcode::ExitCode {
        match self {
            Self::Compile(opts) => generate::cmd(opts),
            Self::Graph(opts) => graph::cmd(opts),
            Self::Preview(opts) => preview::cmd(opts),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Color {
    Auto,
    Always,
    Never,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_verbosity() {
        let opts = Opts::try_parse_from(["forwarder-conf", "-vv", "compile", "--config", "a.toml"])
            .unwrap();
        assert_eq!(opts.log_level(), "trace");

        let opts =
            Opts::try_parse_from(["forwarder-conf", "compile", "-q", "-c", "a.toml"]).unwrap();
        assert_eq!(opts.log_level(), "warn");
    }

    #[test]
    fn parses_compile_overrides() {
        let opts = Opts::try_parse_from([
            "forwarder-conf",
            "--log-format",
            "json",
            "compile",
            "-c",
            "spec.yaml",
            "--set",
            "debug-output=true",
            "--set",
            "strict-validation=true",
        ])
        .unwrap();
        assert_eq!(opts.root.log_format, LogFormat::Json);
        let SubCommand::Compile(compile) = opts.sub_command else {
            panic!("expected compile");
        };
        assert_eq!(compile.options.len(), 2);
        assert_eq!(compile.format, None);
    }

    #[test]
    fn verifies_command() {
        use clap::CommandFactory;
        Opts::command().debug_assert();
    }
}
