//! Tracing output for a full-screen terminal.
//!
//! The terminal is in raw/alternate-screen mode while the player runs, so log events are
//! formatted into single lines and forwarded over a channel to the log panel.

use crossbeam_channel::Sender;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

pub const DEFAULT_FILTER: &str = "info,wave_player=info,wave_engine=info";

/// Install the global subscriber; lines go to `tx`.
pub fn init(tx: Sender<String>) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(LogLayer::new(tx))
        .init();
}

/// Layer that sends `LEVEL target: message k=v ...` lines to a channel.
pub struct LogLayer {
    tx: Sender<String>,
}

impl LogLayer {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl<S> Layer<S> for LogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LogVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let mut line = format!(
            "{} {}: {}",
            meta.level(),
            meta.target(),
            visitor.message.unwrap_or_default()
        );
        if !visitor.fields.is_empty() {
            line.push(' ');
            line.push_str(&visitor.fields.join(" "));
        }
        let _ = self.tx.send(line);
    }
}

#[derive(Default)]
struct LogVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl Visit for LogVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let formatted = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(formatted.trim_matches('"').to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), formatted));
        }
    }
}
