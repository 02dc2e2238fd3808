use classkit::jvm::verifier::{
    InMemoryRepository, Settings, VerificationStatus, Verifier,
};

use clap::{value_parser, Arg, ArgAction, Command};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use walkdir::WalkDir;

fn main() -> io::Result<()> {
    env_logger::init();

    let matches = Command::new("JVM class file verifier")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Check class files the way a class loader would, without running a JVM")
        .arg(
            Arg::new("class")
                .long("class")
                .value_name("CLASS_NAME")
                .required(false)
                .help("Class name to expect when INPUT is a single file (eg. `foo/bar/Baz`)"),
        )
        .arg(
            Arg::new("max-major-version")
                .long("max-major-version")
                .value_name("VERSION")
                .required(false)
                .value_parser(value_parser!(u16))
                .help("Newest class file major version to accept"),
        )
        .arg(
            Arg::new("skip-dataflow")
                .long("skip-dataflow")
                .action(ArgAction::SetTrue)
                .help("Only run the structural passes"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Class file, or directory of class files")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .get_matches();

    let input_path: &PathBuf = matches
        .get_one("INPUT")
        .expect("INPUT is a required argument");
    let mut settings = Settings::default();
    if let Some(max_major_version) = matches.get_one::<u16>("max-major-version") {
        settings.max_major_version = *max_major_version;
    }
    settings.verify_dataflow = !matches.get_flag("skip-dataflow");

    // Find all of the classes, named by their path relative to the input
    let classes: Vec<(String, PathBuf)> = if input_path.is_file() {
        let name = match matches.get_one::<String>("class") {
            Some(name) => name.clone(),
            // Any class whose simple name matches the file name is accepted
            None => input_path
                .file_stem()
                .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned()),
        };
        vec![(name, input_path.clone())]
    } else {
        WalkDir::new(input_path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|e| e.is_file() && e.extension().map_or(false, |ex| ex == "class"))
            .map(|path| {
                let name = class_name_of(input_path, &path.with_extension(""));
                (name, path)
            })
            .collect()
    };
    log::info!("Found {} class files", classes.len());

    let repository = InMemoryRepository::new();
    for (name, path) in &classes {
        repository
            .add_class_bytes(name, fs::read(path)?)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
    }

    // Go through them, one at a time
    let mut count_rejected = 0;
    let stdout = StandardStream::stdout(ColorChoice::Auto);
    for (name, _) in &classes {
        let mut verifier = Verifier::new(name, &repository, settings.clone());
        let result = verifier.verify();
        log::debug!("Ran {:?} on {}", verifier.executed_passes(), name);

        let (color, summary) = match result.status {
            VerificationStatus::Ok => (Color::Green, b"OK".as_ref()),
            VerificationStatus::Rejected => {
                count_rejected += 1;
                (Color::Red, b"REJECTED".as_ref())
            }
        };

        // Print out the verdict
        let mut s = stdout.lock();
        s.write_all(b" - ")?;
        s.set_color(ColorSpec::new().set_bold(true))?;
        s.write_all(name.as_bytes())?;
        s.set_color(ColorSpec::new().set_dimmed(true))?;
        s.write_all(b" [")?;
        s.set_color(ColorSpec::new().set_fg(Some(color)))?;
        s.write_all(summary)?;
        s.set_color(ColorSpec::new().set_dimmed(true))?;
        s.write_all(b"]")?;
        s.reset()?;
        if result.status == VerificationStatus::Rejected {
            write!(s, " {}", result.message)?;
        }
        s.write_all(b"\n")?;
    }

    exit(if count_rejected > 0 { 1 } else { 0 })
}

/// Internal class name for a class file path (without its extension)
fn class_name_of(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
