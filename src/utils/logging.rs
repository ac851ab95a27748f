use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Copies every log line to stderr and to the log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn open_log_file(log_file: &Path) -> io::Result<File> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(log_file)
}

/// Installs the global logger. `RUST_LOG` controls the filter, defaulting to `info`.
/// If the log file cannot be opened, logging continues on stderr only.
pub fn init(log_file: &Path) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            record.level(),
            record.args()
        )
    });

    let file_error = match open_log_file(log_file) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
            None
        }
        Err(e) => Some(e),
    };

    if builder.try_init().is_err() {
        return;
    }
    if let Some(e) = file_error {
        log::warn!("Could not open log file {}: {}. Logging to stderr only", log_file.display(), e);
    }
}
