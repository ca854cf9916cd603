use std::fmt::Write as _;

use clap::Parser;

use crate::{
    config::ComponentKey,
    element::{BlockKey, Document},
    generate,
};

#[derive(Parser, Debug)]
#[command(rename_all = "kebab-case")]
#[group(id = "GraphOpts")]
pub struct Opts {
    #[command(flatten)]
    pub compile: generate::Opts,
}

fn write_edges(dot: &mut String, id: &ComponentKey, inputs: &[ComponentKey]) {
    for input in inputs {
        if let Some(port) = input.port() {
            writeln!(
                dot,
                "  \"{}\" -> \"{}\" [label=\"{}\"]",
                input.component(),
                id,
                port
            )
            .expect("write to String never fails");
        } else {
            writeln!(dot, "  \"{}\" -> \"{}\"", input, id).expect("write to String never fails");
        }
    }
}

/// Renders the component graph of `document` in DOT.
///
/// External inputs are drawn as sources. Routed branches label their edge
/// with the branch name.
pub fn to_dot(document: &Document, external_inputs: &[ComponentKey]) -> String {
    let mut dot = String::from("digraph {\n");

    for id in external_inputs {
        writeln!(dot, "  \"{}\" [shape=\"trapezium\"]", id).expect("write to String never fails");
    }

    for element in document.elements() {
        let (id, shape) = match element.key() {
            BlockKey::Transform(id) => (id, "diamond"),
            BlockKey::Sink(id) => (id, "invtrapezium"),
            BlockKey::Section { .. } => continue,
        };
        writeln!(dot, "  \"{}\" [shape=\"{}\"]", id, shape).expect("write to String never fails");
        write_edges(&mut dot, &id, element.inputs());
    }

    dot += "}";
    dot
}

pub fn cmd(opts: &Opts) -> exitcode::ExitCode {
    let spec = match crate::config::format::load_from_path(&opts.compile.path, opts.compile.format)
    {
        Ok(spec) => spec,
        Err(error) => {
            error!(message = "Could not load forwarder spec.", %error);
            return exitcode::CONFIG;
        }
    };
    let document = match generate::compile_with(&spec, &opts.compile.options(&spec)) {
        Ok(document) => document,
        Err(error) => {
            error!(message = "Could not compile forwarder spec.", %error);
            return exitcode::DATAERR;
        }
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{}", to_dot(&document, &spec.input_ids()));
    }

    exitcode::OK
}
