use forwarder_conf::{
    cli::{LogFormat, Opts},
    trace,
};
use tracing::debug;

fn main() {
    let opts = match Opts::get_matches() {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    trace::init(
        opts.root.use_color(),
        opts.root.log_format == LogFormat::Json,
        opts.log_level(),
    );
    debug!(message = "Starting.", version = forwarder_conf::get_version());

    std::process::exit(opts.sub_command.execute());
}
