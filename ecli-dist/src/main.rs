use std::io::Write;
use std::panic;
use std::sync::Mutex;

// Import everything from the lib version of ourselves
use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use console::Term;
use ecli_dist::*;
use ecli_dist_schema::ReleaseManifest;
use lazy_static::lazy_static;
use miette::{Diagnostic, IntoDiagnostic};
use thiserror::Error;
use tracing::error;

use crate::cli::{
    CleanArgs, PackageArgs, PlanArgs, PublishArgs, SelectArgs, ShowArgs, VerifyArgs,
};

mod cli;

type ReportErrorFunc = dyn Fn(&miette::Report) + Send + Sync + 'static;

lazy_static! {
    static ref REPORT_ERROR: Mutex<Option<Box<ReportErrorFunc>>> = Mutex::new(None);
}

fn set_report_errors_as_json() {
    *REPORT_ERROR.lock().unwrap() = Some(Box::new(move |error| {
        // Manually invoke JSONReportHandler to format the error as a report
        // to out_.
        let mut report = String::new();
        miette::JSONReportHandler::new()
            .render_report(&mut report, error.as_ref())
            .unwrap();
        writeln!(&mut Term::stdout(), r#"{{"error": {report}}}"#).unwrap();
    }));
}

fn report_error(error: &miette::Report) {
    {
        let guard = REPORT_ERROR.lock().unwrap();
        if let Some(do_report) = &*guard {
            do_report(error);
            return;
        }
    }
    error!("{:?}", error);
}

fn main() {
    let cli = Cli::parse();
    // Init the logger; stdout is reserved for machine output (the manifest),
    // so everything we log, errors included, goes to stderr
    tracing_subscriber::fmt::fmt()
        .with_max_level(cli.verbose)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_ansi(console::colors_enabled_stderr())
        .init();

    // Control how errors are formatted by setting the miette hook. This will
    // only be used for errors presented to humans, when formatting an error as
    // JSON, it will be handled by a custom `report_error` override, bypassing
    // the hook.
    miette::set_hook(Box::new(move |_| {
        let graphical_theme = if console::colors_enabled_stderr() {
            miette::GraphicalTheme::unicode()
        } else {
            miette::GraphicalTheme::unicode_nocolor()
        };
        Box::new(
            miette::MietteHandlerOpts::new()
                .graphical_theme(graphical_theme)
                .build(),
        )
    }))
    .expect("failed to initialize error handler");

    // Now that miette is set up, use it to format panics.
    panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            msg
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            &msg[..]
        } else {
            "something went wrong"
        };

        #[derive(Debug, Error, Diagnostic)]
        #[error("{message}")]
        pub struct PanicError {
            pub message: String,
            #[help]
            pub help: Option<String>,
        }

        report_error(
            &miette::Report::from(PanicError {
                message: message.to_owned(),
                help: panic_info
                    .location()
                    .map(|loc| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column())),
            })
            .wrap_err("ecli-dist panicked"),
        );
    }));

    // If we're outputting JSON, replace the error report method such that it
    // writes errors out to the normal output stream as JSON.
    if cli.output_format == OutputFormat::Json {
        set_report_errors_as_json();
    }

    let main_result = real_main(&cli);

    let _ = main_result.map_err(|e| {
        report_error(&e);
        std::process::exit(-1);
    });
}

fn real_main(cli: &Cli) -> Result<(), miette::Report> {
    match &cli.command {
        Commands::Package(args) => cmd_package(cli, args),
        Commands::Plan(args) => cmd_plan(cli, args),
        Commands::Verify(args) => cmd_verify(cli, args),
        Commands::Publish(args) => cmd_publish(cli, args),
        Commands::Show(args) => cmd_show(cli, args),
        Commands::Clean(args) => cmd_clean(cli, args),
    }
}

fn config_from(cli: &Cli, select: &SelectArgs, bundle_mode: config::BundleMode) -> config::Config {
    config::Config {
        project_dir: cli.project_dir.clone(),
        backend: select.backend.to_lib(),
        checksum: select.checksum.to_lib(),
        bundle_mode,
    }
}

fn print_human(out: &mut Term, manifest: &ReleaseManifest) -> Result<(), std::io::Error> {
    for artifact in &manifest.artifacts {
        if let Some(path) = &artifact.path {
            writeln!(out, "{path}")?;
        }
    }
    Ok(())
}

fn print_json(out: &mut Term, manifest: &ReleaseManifest) -> Result<(), std::io::Error> {
    let string = serde_json::to_string_pretty(manifest).unwrap();
    writeln!(out, "{string}")?;
    Ok(())
}

fn print(cli: &Cli, manifest: &ReleaseManifest) -> Result<(), miette::Report> {
    let mut out = Term::stdout();
    match cli.output_format {
        OutputFormat::Human => print_human(&mut out, manifest).into_diagnostic()?,
        OutputFormat::Json => print_json(&mut out, manifest).into_diagnostic()?,
    }
    Ok(())
}

fn cmd_package(cli: &Cli, args: &PackageArgs) -> Result<(), miette::Report> {
    let bundle_mode = if args.fake_bundle {
        config::BundleMode::Fake
    } else {
        config::BundleMode::Real
    };
    let cfg = config_from(cli, &args.select, bundle_mode);
    let manifest = do_package(&cfg)?;
    print(cli, &manifest)
}

fn cmd_plan(cli: &Cli, args: &PlanArgs) -> Result<(), miette::Report> {
    let cfg = config_from(cli, &args.select, config::BundleMode::Real);
    let manifest = do_plan(&cfg)?;
    print(cli, &manifest)
}

fn cmd_verify(cli: &Cli, args: &VerifyArgs) -> Result<(), miette::Report> {
    let cfg = config_from(cli, &args.select, config::BundleMode::Real);
    let manifest = do_verify(&cfg)?;
    print(cli, &manifest)
}

fn cmd_publish(cli: &Cli, args: &PublishArgs) -> Result<(), miette::Report> {
    let cfg = config_from(cli, &args.select, config::BundleMode::Real);
    let manifest = do_publish(&cfg)?;
    print(cli, &manifest)
}

fn cmd_show(cli: &Cli, args: &ShowArgs) -> Result<(), miette::Report> {
    let cfg = config_from(cli, &args.select, config::BundleMode::Real);
    let listing = do_show(&cfg)?;
    let mut out = Term::stdout();
    writeln!(&mut out, "{listing}").into_diagnostic()?;
    Ok(())
}

fn cmd_clean(cli: &Cli, _args: &CleanArgs) -> Result<(), miette::Report> {
    do_clean(&cli.project_dir)?;
    Ok(())
}
