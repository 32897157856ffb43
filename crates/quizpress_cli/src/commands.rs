use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use job_logging::job_info;
use quizpress_engine::{
    discover_default_mappings, find_default_mapping, resolve_mapping, CommandPipeline,
    ConfigResolver, FilePreferenceStore, JobRequest, JobRunner, MappingMode, SessionManager,
    Settings, UploadedFile, DEFAULT_ARCHIVE_NAME, DEFAULT_MANIFEST_NAME,
};

use crate::cli::{Cli, Command, KeyAction, RunArgs};
use crate::render::TerminalObserver;

pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {:?}", cli.config))?;
    let prefs = FilePreferenceStore::new(&cli.profile);

    match cli.command {
        Command::Login { email } => login(&settings, &prefs, &email),
        Command::Logout => {
            SessionManager::new(&settings.credentials, &prefs).logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => status(&settings, &prefs),
        Command::Key { action } => {
            let resolver = ConfigResolver::new(&settings.credentials, &prefs);
            match action {
                KeyAction::Save { key } => {
                    resolver.save_api_key(&key)?;
                    println!("API key saved.");
                }
                KeyAction::Clear => {
                    resolver.clear_api_key()?;
                    println!("API key cleared.");
                }
            }
            Ok(())
        }
        Command::Mappings => {
            let found = discover_default_mappings(&settings.mapping_dir);
            if found.is_empty() {
                println!("No default mapping files in {:?}.", settings.mapping_dir);
            }
            for path in found {
                println!("{}", display_name(&path));
            }
            Ok(())
        }
        Command::Run(args) => run(&settings, &prefs, args),
    }
}

fn login(settings: &Settings, prefs: &FilePreferenceStore, email: &str) -> Result<()> {
    let mut sessions = SessionManager::new(&settings.credentials, prefs);
    if sessions.is_authenticated() {
        if let Some(session) = sessions.session() {
            if session.identity().as_str() != email.trim() {
                println!(
                    "Already logged in as {}; log out first to switch.",
                    session.identity()
                );
                return Ok(());
            }
        }
    }
    let session = sessions.login(email)?;
    println!("Logged in as {}.", session.identity());
    Ok(())
}

fn status(settings: &Settings, prefs: &FilePreferenceStore) -> Result<()> {
    let mut sessions = SessionManager::new(&settings.credentials, prefs);
    match (sessions.is_authenticated(), sessions.session()) {
        (true, Some(session)) => println!("Logged in as {}", session.identity()),
        _ => println!("Not logged in"),
    }

    let allowed = settings.credentials.allowed();
    if allowed.is_open() {
        println!("Access: open (demo) mode");
    } else {
        println!("Access: {} allowed identities", allowed.len());
    }

    let resolver = ConfigResolver::new(&settings.credentials, prefs);
    println!(
        "API key: saved {}, system default {}",
        yes_no(resolver.saved_api_key_present()),
        yes_no(settings.credentials.default_api_key().is_some())
    );
    println!(
        "Default mappings: {} in {:?}",
        discover_default_mappings(&settings.mapping_dir).len(),
        settings.mapping_dir
    );
    match &settings.pipeline {
        Some(command) => println!("Pipeline: {}", command.program),
        None => println!("Pipeline: not configured"),
    }
    Ok(())
}

fn run(settings: &Settings, prefs: &FilePreferenceStore, args: RunArgs) -> Result<()> {
    let mut sessions = SessionManager::new(&settings.credentials, prefs);
    if !sessions.is_authenticated() {
        bail!("Not logged in. Run `quizpress login <email>` first.");
    }

    let command = settings
        .pipeline
        .clone()
        .context("No [pipeline] command configured in the settings file")?;
    let pipeline = CommandPipeline::new(command);

    let resolver = ConfigResolver::new(&settings.credentials, prefs);
    let api_key = resolver.resolve_api_key(args.api_key.as_deref());

    let (mode, uploaded, selected) = match (&args.mapping, &args.default_mapping) {
        (Some(path), _) => (MappingMode::Upload, Some(read_upload(path)?), Vec::new()),
        (None, Some(name)) => {
            let candidates = discover_default_mappings(&settings.mapping_dir);
            let chosen = find_default_mapping(&candidates, name).with_context(|| {
                format!(
                    "No default mapping named {name:?} in {:?}",
                    settings.mapping_dir
                )
            })?;
            (MappingMode::SystemDefault, None, vec![chosen])
        }
        (None, None) => (MappingMode::Upload, None, Vec::new()),
    };
    let mapping = resolve_mapping(mode, uploaded, &selected);

    let inputs = args
        .inputs
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>>>()?;
    println!("Selected {} file(s).", inputs.len());

    let request = JobRequest::new(inputs)
        .with_mapping(mapping)
        .with_api_key(api_key);
    let mut observer = TerminalObserver::new();
    let outcome = JobRunner::new(&pipeline).run(request, &mut observer)?;

    let manifest_name = (!args.no_manifest).then_some(DEFAULT_MANIFEST_NAME);
    let archive_path = outcome
        .package
        .write_to(&args.out, DEFAULT_ARCHIVE_NAME, manifest_name)
        .with_context(|| format!("Failed to write results to {:?}", args.out))?;

    job_info!("Results written to {:?}", archive_path);
    println!("Result files:");
    for name in outcome.package.manifest() {
        println!("  {name}");
    }
    println!("Archive: {}", archive_path.display());
    Ok(())
}

fn read_upload(path: &Path) -> Result<UploadedFile> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(UploadedFile::new(display_name(path), bytes))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
