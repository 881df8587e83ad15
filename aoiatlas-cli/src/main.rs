//! AOI Atlas CLI - Command-line interface
//!
//! Resolves an administrative area of interest against remote boundary
//! layers and prints the indicator report as JSON on stdout.

mod error;

use clap::Parser;

use aoiatlas::config::Settings;
use aoiatlas::logging::{default_log_dir, default_log_file, init_logging};
use aoiatlas::resolver::AoiRequest;
use aoiatlas::service::ReportService;

use error::CliError;

#[derive(Parser)]
#[command(name = "aoiatlas")]
#[command(about = "Generate indicator reports for an administrative area of interest", long_about = None)]
struct Args {
    /// State name, for example "Tripura" (required)
    #[arg(long)]
    state: String,

    /// District name within the state
    #[arg(long)]
    district: Option<String>,

    /// Block name within the district
    #[arg(long)]
    block: Option<String>,

    /// Village name
    #[arg(long)]
    village: Option<String>,

    /// Only resolve the AOI; skip indicator queries
    #[arg(long)]
    resolve_only: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn request(&self) -> AoiRequest {
        let mut request = AoiRequest::new(&self.state);
        if let Some(district) = &self.district {
            request = request.district(district);
        }
        if let Some(block) = &self.block {
            request = request.block(block);
        }
        if let Some(village) = &self.village {
            request = request.village(village);
        }
        request
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _logging_guard = match init_logging(default_log_dir(), default_log_file()) {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    tracing::info!(version = aoiatlas::VERSION, "aoiatlas starting");

    let settings = Settings::from_env();
    let service = match ReportService::new(settings) {
        Ok(service) => service,
        Err(e) => CliError::ServiceCreation(e).exit(),
    };

    let request = args.request();
    let output = if args.resolve_only {
        match service.resolve(&request).await {
            Ok(resolution) => serialize(&resolution, args.pretty),
            Err(e) => CliError::Resolve(e).exit(),
        }
    } else {
        match service.report(&request).await {
            Ok(report) => serialize(&report, args.pretty),
            Err(e) => CliError::Report(e).exit(),
        }
    };

    match output {
        Ok(json) => println!("{}", json),
        Err(e) => CliError::Serialize(e).exit(),
    }
}

fn serialize<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
