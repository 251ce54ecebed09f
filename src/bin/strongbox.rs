use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};

use strongbox::armor;
use strongbox::controller::{JobStatus, WorkflowController};
use strongbox::error::{ErrorCategory, ErrorKind, FailureReason, Result, StrongboxError};
use strongbox::job::{ExportArtifact, JobKind};
use strongbox::secret::SecretBuffer;

#[derive(Parser, Debug)]
#[command(
    name = "strongbox",
    version,
    about = "password-based file encryption preserving the original name",
    disable_version_flag = true
)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long = "password-stdin", action = ArgAction::SetTrue, global = true)]
    password_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file into a strongbox container
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Where to write the container; defaults to the suggested
        /// container name next to the input
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Write armored text instead of a binary container
        #[arg(long = "armor", action = ArgAction::SetTrue)]
        armor: bool,
    },
    /// Decrypt a container, restoring the original file name by default
    Decrypt {
        /// Path to the container to decrypt (binary or armored)
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Where to write the restored file; defaults to the original
        /// name next to the input
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encrypt {
            input,
            output,
            armor,
        } => run(JobKind::Encrypt, &input, output, armor, cli.password_stdin),
        Commands::Decrypt { input, output } => {
            run(JobKind::Decrypt, &input, output, false, cli.password_stdin)
        }
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        if err.kind == Some(ErrorKind::WeakPassword) {
            eprintln!(
                "a strong password has at least 8 characters and includes \
                 upper and lower case letters, numbers and symbols"
            );
        }
        std::process::exit(1);
    }
}

fn run(
    kind: JobKind,
    input: &Path,
    output: Option<PathBuf>,
    armored_output: bool,
    password_stdin: bool,
) -> Result<()> {
    let source_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            StrongboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidInput,
                "input file name is not valid UTF-8",
            )
        })?
        .to_string();

    let mut source = fs::read(input).map_err(|e| read_error(input, e))?;
    if kind == JobKind::Decrypt && armor::looks_armored(&source) {
        let text = String::from_utf8(source).map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::ArmorInvalid,
                "armored input is not valid UTF-8",
                e,
            )
        })?;
        source = armor::unwrap(text.trim_end())?;
    }

    let password = read_password(password_stdin)?;

    let controller = WorkflowController::new();
    let handle = controller.submit(kind, &source_name, source, password)?;
    let artifact = loop {
        match controller.poll(&handle)? {
            JobStatus::Pending => thread::sleep(Duration::from_millis(25)),
            JobStatus::Succeeded(artifact) => break artifact,
            JobStatus::Failed(reason) => {
                controller.complete_and_clear(&handle)?;
                return Err(failure_to_error(reason));
            }
        }
    };
    controller.complete_and_clear(&handle)?;

    let out_path = output.unwrap_or_else(|| sibling_path(input, artifact.suggested_name()));
    export(&artifact, &out_path, armored_output)?;

    match kind {
        JobKind::Encrypt => eprintln!("encrypted to {}", out_path.display()),
        JobKind::Decrypt => eprintln!(
            "restored {} ({})",
            out_path.display(),
            artifact.descriptor().mime()
        ),
    }
    Ok(())
}

/// Default output location: the artifact's suggested name, next to the input.
fn sibling_path(input: &Path, suggested_name: &str) -> PathBuf {
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(suggested_name),
        _ => PathBuf::from(suggested_name),
    }
}

fn export(artifact: &ExportArtifact, path: &Path, armored: bool) -> Result<()> {
    let written = if armored {
        let wrapped = armor::wrap(artifact.payload());
        write_file_secure(path, wrapped.as_bytes())
    } else {
        write_file_secure(path, artifact.payload())
    };
    written.map_err(|e| e.with_context(format!("failed to write to {}", path.display())))
}

fn read_password(from_stdin: bool) -> Result<SecretBuffer> {
    if from_stdin {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        return Ok(SecretBuffer::new(text));
    }

    if !io::stdin().is_terminal() {
        return Err(StrongboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidInput,
            "cannot read password from terminal - stdin is not a terminal",
        ));
    }

    // Read password *without echo*
    let password = rpassword::prompt_password("Password (strongbox): ").map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InvalidInput,
            format!("failure reading password: {}", e),
            e,
        )
    })?;
    Ok(SecretBuffer::new(password))
}

/// Write the export atomically (tempfile + fsync + rename) with secure
/// permissions (0o600 on Unix). Either the old file or the complete new
/// file exists, never a partial one.
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| {
                StrongboxError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to get tempfile metadata",
                    e,
                )
            })?
            .permissions();
        perms.set_mode(0o600);
        temp_file.as_file().set_permissions(perms).map_err(|e| {
            StrongboxError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to set tempfile permissions",
                e,
            )
        })?;
    }

    temp_file.persist(path).map_err(|e| {
        StrongboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> StrongboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    StrongboxError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

fn failure_to_error(reason: FailureReason) -> StrongboxError {
    match reason.kind {
        Some(kind) => StrongboxError::with_kind(reason.category, kind, reason.message()),
        None => StrongboxError::new(reason.category, reason.message()),
    }
}
