//! Compiles a forwarder spec into one vector configuration document.

use std::{
    fs::{File, create_dir_all},
    io::Write,
    path::{Path, PathBuf},
};

use clap::Parser;
use colored::*;
use snafu::Snafu;

use crate::{
    config::{
        self, ComponentKey, ForwarderSpec, Format, Options, make_input_id, make_output_id,
        validation::ShapeError,
    },
    element::{Document, Elements},
    sinks::{self, BuildError, SinkContext},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("Pipeline \"{}\" references undeclared input \"{}\".", pipeline, input))]
    UnknownInput { pipeline: String, input: String },
    #[snafu(display("Pipeline \"{}\" references undeclared output \"{}\".", pipeline, output))]
    UnknownOutput { pipeline: String, output: String },
    #[snafu(context(false), display("{}", source))]
    Build { source: BuildError },
    #[snafu(context(false), display("{}", source))]
    Shape { source: ShapeError },
}

fn check_references(spec: &ForwarderSpec) -> Result<(), CompileError> {
    for pipeline in &spec.pipelines {
        if let Some(input) = pipeline
            .input_refs
            .iter()
            .find(|input| !spec.has_input(input))
        {
            return UnknownInputSnafu {
                pipeline: pipeline.name.as_str(),
                input: input.as_str(),
            }
            .fail();
        }
        if let Some(output) = pipeline
            .output_refs
            .iter()
            .find(|output| spec.output(output).is_none())
        {
            return UnknownOutputSnafu {
                pipeline: pipeline.name.as_str(),
                output: output.as_str(),
            }
            .fail();
        }
    }
    Ok(())
}

/// Input IDs feeding `output`, in pipeline order, each listed once.
pub fn output_inputs(spec: &ForwarderSpec, output: &str) -> Vec<ComponentKey> {
    let mut inputs = Vec::new();
    for pipeline in spec
        .pipelines
        .iter()
        .filter(|pipeline| pipeline.output_refs.iter().any(|name| name == output))
    {
        for id in pipeline.input_refs.iter().map(|name| make_input_id(name)) {
            if !inputs.contains(&id) {
                inputs.push(id);
            }
        }
    }
    inputs
}

/// Compiles `spec` using the options it carries.
pub fn compile(spec: &ForwarderSpec) -> Result<Document, CompileError> {
    compile_with(spec, &spec.options)
}

/// Compiles `spec`, generating every referenced output in declaration order.
///
/// Either the whole document is returned or the first error; partial output
/// never escapes.
pub fn compile_with(spec: &ForwarderSpec, options: &Options) -> Result<Document, CompileError> {
    check_references(spec)?;

    let mut elements = Elements::new();
    for output in &spec.outputs {
        let inputs = output_inputs(spec, &output.name);
        if inputs.is_empty() {
            warn!(
                message = "Output is not referenced by any pipeline, skipping.",
                output = %output.name,
            );
            continue;
        }
        let cx = SinkContext::new(
            make_output_id(&output.name),
            output,
            inputs,
            &spec.secrets,
            options,
        );
        elements.extend(sinks::build(&cx)?);
    }

    let document = Document::new(elements, &spec.input_ids())?;
    debug!(
        message = "Compiled forwarder spec.",
        components = document.component_ids().count(),
    );
    Ok(document)
}

/// Splits a `KEY=VALUE` option override.
fn parse_option(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("Invalid option \"{}\", expected KEY=VALUE", s))
}

#[derive(Parser, Debug)]
#[command(rename_all = "kebab-case")]
pub struct Opts {
    /// Forwarder spec to compile. The format is detected from the file
    /// extension unless `--format` is given.
    #[arg(id = "config", short, long, env = "FORWARDER_CONF_CONFIG")]
    pub path: PathBuf,

    /// Format of the forwarder spec.
    #[arg(long, env = "FORWARDER_CONF_FORMAT")]
    pub format: Option<Format>,

    /// Override a generator option, e.g. `--set debug-output=true`.
    #[arg(long = "set", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// Write the document to a file instead of stdout.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl Opts {
    /// The spec's options with the command line overrides applied.
    pub fn options(&self, spec: &ForwarderSpec) -> Options {
        let mut options = spec.options.clone();
        for (key, value) in &self.options {
            options.set(key.clone(), value.clone());
        }
        options
    }
}

/// Loads and compiles the spec named by `opts`, printing errors in red.
pub fn load_and_compile(opts: &Opts) -> Result<Document, exitcode::ExitCode> {
    let spec = config::format::load_from_path(&opts.path, opts.format).map_err(|error| {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}", error.to_string().red());
        }
        exitcode::CONFIG
    })?;
    compile_with(&spec, &opts.options(&spec)).map_err(|error| {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}", error.to_string().red());
        }
        exitcode::DATAERR
    })
}

pub fn cmd(opts: &Opts) -> exitcode::ExitCode {
    let document = match load_and_compile(opts) {
        Ok(document) => document,
        Err(code) => return code,
    };
    if document.is_empty() {
        warn!(message = "No output is referenced by a pipeline, the document is empty.");
    }
    let body = document.to_string();

    match &opts.file {
        Some(path) => match write_config(path, &body) {
            Ok(()) => {
                info!(message = "Config file written.", path = ?path);
                exitcode::OK
            }
            Err(error) => {
                #[allow(clippy::print_stderr)]
                {
                    eprintln!("{}", format!("Failed to write {:?}: {}", path, error).red());
                }
                exitcode::IOERR
            }
        },
        None => {
            #[allow(clippy::print_stdout)]
            {
                print!("{}", body);
            }
            exitcode::OK
        }
    }
}

fn write_config(path: &Path, body: &str) -> std::io::Result<()> {
    if let Some(directory) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        create_dir_all(directory)?;
    }
    File::create(path).and_then(|mut file| file.write_all(body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputSpec, OutputSpec, OutputType, PipelineSpec};

    fn pipeline(name: &str, inputs: &[&str], outputs: &[&str]) -> PipelineSpec {
        PipelineSpec {
            name: name.into(),
            input_refs: inputs.iter().map(|s| (*s).to_owned()).collect(),
            output_refs: outputs.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn parses_option_overrides() {
        assert_eq!(
            parse_option("debug-output=true"),
            Ok(("debug-output".to_owned(), "true".to_owned()))
        );
        assert_eq!(
            parse_option("ciphers=a=b"),
            Ok(("ciphers".to_owned(), "a=b".to_owned()))
        );
        assert!(parse_option("novalue").is_err());
        assert!(parse_option("=x").is_err());
    }

    #[test]
    fn merges_inputs_across_pipelines() {
        let spec = ForwarderSpec {
            inputs: vec![InputSpec {
                name: "my-app".into(),
            }],
            pipelines: vec![
                pipeline("a", &["application", "my-app"], &["web"]),
                pipeline("b", &["my-app", "audit"], &["web"]),
            ],
            outputs: vec![OutputSpec::new("web", OutputType::Http, "https://web")],
            ..Default::default()
        };
        assert_eq!(
            output_inputs(&spec, "web"),
            [
                ComponentKey::from("input_application"),
                ComponentKey::from("input_my_app"),
                ComponentKey::from("input_audit"),
            ]
        );
    }

    #[test]
    fn rejects_dangling_references() {
        let spec = ForwarderSpec {
            pipelines: vec![pipeline("a", &["nope"], &["web"])],
            outputs: vec![OutputSpec::new("web", OutputType::Http, "https://web")],
            ..Default::default()
        };
        assert!(matches!(
            compile(&spec),
            Err(CompileError::UnknownInput { .. })
        ));

        let spec = ForwarderSpec {
            pipelines: vec![pipeline("a", &["application"], &["missing"])],
            ..Default::default()
        };
        let error = compile(&spec).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Pipeline \"a\" references undeclared output \"missing\"."
        );
    }

    #[test]
    fn skips_unreferenced_outputs() {
        let spec = ForwarderSpec {
            outputs: vec![OutputSpec::new("web", OutputType::Http, "https://web")],
            ..Default::default()
        };
        assert!(compile(&spec).unwrap().is_empty());
    }

    #[test]
    fn colliding_output_names_fail() {
        let spec = ForwarderSpec {
            pipelines: vec![pipeline("a", &["application"], &["web-1", "web_1"])],
            outputs: vec![
                OutputSpec::new("web-1", OutputType::Http, "https://one"),
                OutputSpec::new("web_1", OutputType::Http, "https://two"),
            ],
            ..Default::default()
        };
        assert!(matches!(
            compile(&spec),
            Err(CompileError::Shape {
                source: ShapeError::DuplicateBlock { .. }
            })
        ));
    }

    #[test]
    fn writes_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/vector.toml");
        write_config(&path, "a = 1\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a = 1\n");
    }
}
