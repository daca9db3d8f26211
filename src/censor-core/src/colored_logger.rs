//! Logging setup
//!
//! Every line carries a date, a component tag, the level and the emitting
//! crate. The console copy is colored and goes to stderr so `censor redact`
//! can print its result on stdout. An optional log file receives the same
//! lines without escape codes.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Which part of the program is logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Main,
    Bot,
    Redact,
}

impl Component {
    pub fn tag(&self) -> &'static str {
        match self {
            Component::Main => "MAIN",
            Component::Bot => "BOT",
            Component::Redact => "REDACT",
        }
    }

    fn style(&self) -> Style {
        match self {
            Component::Main => Style::new().cyan().bold(),
            Component::Bot => Style::new().green().bold(),
            Component::Redact => Style::new().magenta().bold(),
        }
    }
}

/// Where log lines go besides stderr
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub level: Level,
    /// Append plain-text lines to this file as well
    pub file: Option<PathBuf>,
}

/// Line format shared by the console and the log file
pub struct ComponentFormat {
    component: Component,
    ansi: bool,
}

impl ComponentFormat {
    pub fn colored(component: Component) -> Self {
        Self { component, ansi: true }
    }

    pub fn plain(component: Component) -> Self {
        Self { component, ansi: false }
    }

    fn paint(&self, writer: &mut Writer<'_>, text: &str, style: Style) -> fmt::Result {
        if self.ansi {
            write!(writer, "{} ", text.style(style))
        } else {
            write!(writer, "{} ", text)
        }
    }
}

fn level_label(level: &Level) -> (&'static str, Style) {
    match *level {
        Level::ERROR => ("ERROR", Style::new().red().bold()),
        Level::WARN => ("WARN ", Style::new().yellow().bold()),
        Level::INFO => ("INFO ", Style::new().green().bold()),
        Level::DEBUG => ("DEBUG", Style::new().blue().bold()),
        Level::TRACE => ("TRACE", Style::new().dimmed().bold()),
    }
}

impl<S, N> FormatEvent<S, N> for ComponentFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let dim = Style::new().dimmed();

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.paint(&mut writer, &timestamp, dim)?;
        self.paint(
            &mut writer,
            &format!("[{:6}]", self.component.tag()),
            self.component.style(),
        )?;

        let (label, style) = level_label(metadata.level());
        self.paint(&mut writer, label, style)?;

        let krate = metadata.target().split("::").next().unwrap_or_default();
        self.paint(&mut writer, krate, dim)?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Plain-text layer appending to `path`, creating its directory if needed
pub fn file_layer<S>(component: Component, path: &Path) -> Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path {:?} has no file name", path))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {:?}", dir))?;

    let appender: RollingFileAppender = rolling::never(dir, file_name);
    Ok(tracing_subscriber::fmt::layer()
        .event_format(ComponentFormat::plain(component))
        .with_writer(appender)
        .with_ansi(false))
}

/// Install the global subscriber for `component`.
///
/// `RUST_LOG` directives are honored on top of `options.level`. Call once per
/// process.
pub fn init_component_logger(component: Component, options: &LogOptions) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(options.level.into());

    let console = tracing_subscriber::fmt::layer()
        .event_format(ComponentFormat::colored(component))
        .with_writer(std::io::stderr);

    let file = options
        .file
        .as_deref()
        .map(|path| file_layer(component, path))
        .transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;

    #[test]
    fn test_component_tags_fit() {
        for component in [Component::Main, Component::Bot, Component::Redact] {
            assert!(component.tag().len() <= 6);
        }
    }

    #[test]
    fn test_file_layer_writes_plain_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs.txt");

        let layer = file_layer(Component::Redact, &path).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            info!(user = 7, "session timed out");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[REDACT]"), "{}", written);
        assert!(written.contains("INFO"));
        assert!(written.contains("session timed out"));
        assert!(written.contains("user=7"));
        assert!(!written.contains('\u{1b}'), "file lines must not carry colors");
    }

    #[test]
    fn test_file_layer_needs_file_name() {
        let result = file_layer::<tracing_subscriber::Registry>(Component::Main, Path::new("/"));
        assert!(result.is_err());
    }
}
