use anyhow::{bail, Context};
use clap::{parser::ValueSource, Arg, ArgAction, ArgMatches, Command, ValueEnum};
use colorize::AnsiColor;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use star::{
    Archive, ArchiveStats, FreeRange, LocalWorkspace, MemberRecord, SourceMeta, Workspace,
};
use std::{
    fs::{File, OpenOptions},
    io::{self, stdout, Read, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("star")
        .about("Create, inspect and maintain star archives")
        .arg_required_else_help(true)
        .arg(
            Arg::new("create")
                .short('c')
                .long("create")
                .action(ArgAction::SetTrue)
                .help("Create ARCHIVE from MEMBERS"),
        )
        .arg(
            Arg::new("list")
                .short('t')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List live members"),
        )
        .arg(
            Arg::new("delete")
                .short('d')
                .long("delete")
                .action(ArgAction::SetTrue)
                .help("Delete the first named member"),
        )
        .arg(
            Arg::new("append")
                .short('r')
                .long("append")
                .action(ArgAction::SetTrue)
                .help("Append the first named member"),
        )
        .arg(
            Arg::new("extract")
                .short('x')
                .long("extract")
                .action(ArgAction::SetTrue)
                .help("Extract the named members, or all of them"),
        )
        .arg(
            Arg::new("update")
                .short('u')
                .long("update")
                .action(ArgAction::SetTrue)
                .help("Replace the first named member with its current content"),
        )
        .arg(
            Arg::new("pack")
                .short('p')
                .long("pack")
                .action(ArgAction::SetTrue)
                .help("Compact the archive"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue))
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .action(ArgAction::SetTrue)
                .requires("json"),
        )
        .arg(
            Arg::new("dir")
                .short('C')
                .long("directory")
                .value_name("DIR")
                .default_value(".")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dump_dir")
                .long("dump-dir")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dir_format")
                .long("dirformat")
                .requires("dump_dir")
                .value_parser(clap::value_parser!(DirFormat)),
        )
        .arg(
            Arg::new("archive_path")
                .value_name("ARCHIVE")
                .required(true),
        )
        .arg(
            Arg::new("members")
                .value_name("MEMBERS")
                .num_args(0..)
                .action(ArgAction::Append),
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Create,
    List,
    Delete,
    Append,
    Extract,
    Update,
    Pack,
}

const OPS: [(&str, Op); 7] = [
    ("create", Op::Create),
    ("list", Op::List),
    ("delete", Op::Delete),
    ("append", Op::Append),
    ("extract", Op::Extract),
    ("update", Op::Update),
    ("pack", Op::Pack),
];

impl Op {
    fn name(self) -> &'static str {
        match self {
            Op::Create => "create",
            Op::List => "list",
            Op::Delete => "delete",
            Op::Append => "append",
            Op::Extract => "extract",
            Op::Update => "update",
            Op::Pack => "pack",
        }
    }
}

#[derive(Debug, ValueEnum, Clone, Copy, Default, PartialEq, Eq)]
#[clap(rename_all = "snake_case")]
pub enum DirFormat {
    #[default]
    Bitcode,
    Json,
}

struct Invocation {
    archive_path: PathBuf,
    members: Vec<String>,
    ops: Vec<Op>,
    workspace: LocalWorkspace,
    verbose: bool,
    json: bool,
    pretty: bool,
    dump_dir: Option<(PathBuf, DirFormat)>,
}

impl Invocation {
    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let archive_path = matches
            .get_one::<String>("archive_path")
            .context("Couldn't get archive path from args")?;
        let members = matches
            .get_many::<String>("members")
            .map(|m| m.cloned().collect())
            .unwrap_or_default();
        let dir = matches
            .get_one::<PathBuf>("dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("."));
        let ops = selected_ops(matches);
        if ops.is_empty() {
            bail!("No operation selected, use one of -c -t -d -r -x -u -p");
        }
        let dump_dir = matches.get_one::<PathBuf>("dump_dir").map(|path| {
            let format = matches
                .get_one::<DirFormat>("dir_format")
                .copied()
                .unwrap_or_default();
            (path.clone(), format)
        });

        Ok(Self {
            archive_path: PathBuf::from(archive_path),
            members,
            ops,
            workspace: LocalWorkspace::new(dir),
            verbose: matches.get_flag("verbose"),
            json: matches.get_flag("json"),
            pretty: matches.get_flag("pretty"),
            dump_dir,
        })
    }

    /// The member a single-name operation works on.
    fn single_member(&self, op: Op) -> anyhow::Result<&str> {
        let Some(first) = self.members.first() else {
            bail!("{} needs a member name", op.name());
        };
        if self.members.len() > 1 {
            warn!(op = op.name(), member = %first, "only the first member is used");
        }
        Ok(first)
    }
}

/// Operations in the order their flags appear on the command line.
fn selected_ops(matches: &ArgMatches) -> Vec<Op> {
    let mut ops: Vec<(usize, Op)> = OPS
        .iter()
        .filter(|(id, _)| matches.value_source(id) == Some(ValueSource::CommandLine))
        .filter_map(|(id, op)| matches.index_of(id).map(|index| (index, *op)))
        .collect();
    ops.sort_by_key(|(index, _)| *index);
    ops.into_iter().map(|(_, op)| op).collect()
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let invocation = Invocation::from_matches(&matches)?;
    init_tracing(invocation.verbose);
    run(&invocation)
}

fn run(invocation: &Invocation) -> anyhow::Result<()> {
    for op in &invocation.ops {
        run_op(invocation, *op).with_context(|| {
            format!(
                "Couldn't {} {}",
                op.name(),
                invocation.archive_path.display()
            )
        })?;
    }
    if let Some((path, format)) = &invocation.dump_dir {
        dump_directory(&invocation.archive_path, path, *format)
            .with_context(|| format!("Couldn't write directory to {}", path.display()))?;
    }
    Ok(())
}

fn run_op(invocation: &Invocation, op: Op) -> anyhow::Result<()> {
    let workspace = &invocation.workspace;
    match op {
        Op::Create => {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&invocation.archive_path)?;
            let mut archive = Archive::new(file);
            let total: u64 = invocation
                .members
                .iter()
                .filter_map(|name| workspace.stat(name).ok())
                .map(|meta| meta.size)
                .sum();
            let progress = ProgressWorkspace::new(workspace, total);
            let directory = archive.create(&progress, &invocation.members)?;
            progress.finish();
            info!(members = directory.live_count(), "created");
        }
        Op::List => {
            let mut archive = open_archive(&invocation.archive_path, false)?;
            print_listing(&mut archive, invocation)?;
        }
        Op::Delete => {
            let name = invocation.single_member(op)?;
            let mut archive = open_archive(&invocation.archive_path, true)?;
            let free = archive.delete(name)?;
            info!(name, free_ranges = free.len(), "deleted");
        }
        Op::Append => {
            let name = invocation.single_member(op)?;
            let mut archive = open_archive(&invocation.archive_path, true)?;
            let total = workspace.stat(name).map(|meta| meta.size).unwrap_or(0);
            let progress = ProgressWorkspace::new(workspace, total);
            let record = archive.append(&progress, name)?;
            progress.finish();
            info!(name, start = record.start, "appended");
        }
        Op::Extract => {
            let mut archive = open_archive(&invocation.archive_path, false)?;
            let total: u64 = archive
                .list()?
                .iter()
                .filter(|m| invocation.members.is_empty() || invocation.members.contains(&m.name))
                .map(|m| m.size)
                .sum();
            let progress = ProgressWorkspace::new(workspace, total);
            let extracted = archive.extract(&progress, &invocation.members)?;
            progress.finish();
            info!(members = extracted.len(), "extracted");
        }
        Op::Update => {
            let name = invocation.single_member(op)?;
            let mut archive = open_archive(&invocation.archive_path, true)?;
            let total = workspace.stat(name).map(|meta| meta.size).unwrap_or(0);
            let progress = ProgressWorkspace::new(workspace, total);
            let record = archive.update(&progress, name)?;
            progress.finish();
            info!(name, start = record.start, "updated");
        }
        Op::Pack => {
            let mut archive = open_archive(&invocation.archive_path, true)?;
            let reclaimed = archive.pack()?;
            info!(reclaimed, "packed");
        }
    }
    Ok(())
}

fn open_archive(path: &Path, writable: bool) -> anyhow::Result<Archive<File>> {
    let file = OpenOptions::new()
        .read(true)
        .write(writable)
        .open(path)
        .with_context(|| format!("Couldn't open {}", path.display()))?;
    Ok(Archive::new(file))
}

#[derive(Debug, Serialize)]
struct Listing {
    members: Vec<MemberRecord>,
    free_space: Vec<FreeRange>,
    stats: ArchiveStats,
}

fn print_listing(archive: &mut Archive<File>, invocation: &Invocation) -> anyhow::Result<()> {
    if invocation.json {
        let listing = Listing {
            members: archive.list()?,
            free_space: archive.free_space()?.iter().copied().collect(),
            stats: archive.stats()?,
        };
        if invocation.pretty {
            serde_json::to_writer_pretty(stdout().lock(), &listing)?;
        } else {
            serde_json::to_writer(stdout().lock(), &listing)?;
        }
        println!();
        return Ok(());
    }

    let directory = archive.directory()?;
    println!(
        "{}",
        format!(
            "{:>4}  {:<32} {:>8} {:>10} {:>10} {:>10}",
            "slot", "name", "mode", "size", "start", "end"
        )
        .bold()
    );
    for (index, member) in directory.live_members() {
        println!(
            "{:>4}  {:<32} {:>8o} {:>10} {:>10} {:>10}",
            index, member.name, member.mode, member.size, member.start, member.end
        );
    }

    if invocation.verbose {
        for range in archive.free_space()?.iter() {
            println!(
                "{}",
                AnsiColor::redb(format!(
                    "Free space: {}..{} ({} bytes, slot {})",
                    range.start,
                    range.end,
                    range.len(),
                    range.index
                ))
            );
        }
        serde_yaml::to_writer(stdout().lock(), &archive.stats()?)?;
    }
    Ok(())
}

fn dump_directory(archive_path: &Path, path: &Path, format: DirFormat) -> anyhow::Result<()> {
    let directory = open_archive(archive_path, false)?.directory()?;
    let mut f = File::create(path)?;
    match format {
        DirFormat::Bitcode => f.write_all(&bitcode::encode(&directory))?,
        DirFormat::Json => serde_json::to_writer(&mut f, &directory)?,
    }
    Ok(())
}

/// Counts member bytes as they move between the workspace and the archive.
struct ProgressWorkspace<'a, W> {
    inner: &'a W,
    bar: ProgressBar,
}

impl<'a, W: Workspace> ProgressWorkspace<'a, W> {
    fn new(inner: &'a W, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "[{elapsed_precise}] [{eta}] {wide_bar} {bytes}/{total_bytes} ({percent}%)",
        ) {
            bar.set_style(style);
        }
        Self { inner, bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl<W: Workspace> Workspace for ProgressWorkspace<'_, W> {
    type Reader = ProgressTrackingReader<W::Reader>;
    type Writer = ProgressTrackingWriter<W::Writer>;

    fn stat(&self, name: &str) -> io::Result<SourceMeta> {
        self.inner.stat(name)
    }

    fn open(&self, name: &str) -> io::Result<Self::Reader> {
        self.bar.println(name);
        Ok(ProgressTrackingReader(self.inner.open(name)?, self.bar.clone()))
    }

    fn create(&self, name: &str) -> io::Result<Self::Writer> {
        self.bar.println(name);
        Ok(ProgressTrackingWriter(self.inner.create(name)?, self.bar.clone()))
    }
}

struct ProgressTrackingReader<R>(R, ProgressBar);
impl<R: Read> Read for ProgressTrackingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.0.read(buf)?;
        self.1.inc(read as u64);
        Ok(read)
    }
}

struct ProgressTrackingWriter<W>(W, ProgressBar);
impl<W: Write> Write for ProgressTrackingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.0.write(buf)?;
        self.1.inc(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
