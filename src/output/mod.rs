// src/output/mod.rs

//! Output pipeline: raw pipe bytes → [`buffer`] → [`encoding`] →
//! [`template`] → [`sink`].
//!
//! An [`OutputPlan`] is compiled once per task instance and shared by every
//! run of that task.

pub mod buffer;
pub mod encoding;
pub mod sink;
pub mod template;

use std::sync::Arc;

use tracing::warn;

use crate::errors::Result;
use crate::task::Task;

pub use buffer::{BufferTiming, OutputBuffer, DEFAULT_FLUSH_TIMEOUT, DEFAULT_MERGE_THRESHOLD};
pub use encoding::{Normalizer, StreamDecoder};
pub use sink::{MemorySink, Sink, SinkWriter};
pub use template::{LineFormat, TemplateError};

/// Normalizes, formats and writes emissions for one stream.
#[derive(Debug, Clone, Default)]
pub struct Emitter {
    sink: Option<Sink>,
    format: Option<Arc<LineFormat>>,
    normalizer: Normalizer,
}

impl Emitter {
    pub fn new(sink: Option<Sink>, format: Option<Arc<LineFormat>>, normalizer: Normalizer) -> Self {
        Self {
            sink,
            format,
            normalizer,
        }
    }

    /// An emitter that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether emissions go anywhere: a sink is configured and the template
    /// is non-empty.
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some() && self.format.is_some()
    }

    /// Decode raw process output and emit it.
    pub fn emit_bytes(&self, raw: &[u8]) {
        if let (Some(sink), Some(format)) = (&self.sink, &self.format) {
            let text = self.normalizer.normalize(raw);
            write_emission(sink, format.render(&text));
        }
    }

    /// Incremental decoder for the stream this emitter serves.
    pub fn stream_decoder(&self) -> StreamDecoder {
        self.normalizer.stream_decoder()
    }

    /// Emit text that is already decoded, such as an error message.
    pub fn emit_text(&self, text: &str) {
        if let (Some(sink), Some(format)) = (&self.sink, &self.format) {
            let text = text.trim_end_matches(['\r', '\n']);
            write_emission(sink, format.render(text));
        }
    }
}

fn write_emission(sink: &Sink, rendered: String) {
    if let Err(e) = sink.emit(rendered.as_bytes()) {
        warn!(error = %e, "failed to write emission to sink");
    }
}

/// Everything a run needs to turn its two output streams into emissions.
#[derive(Debug, Clone)]
pub struct OutputPlan {
    pub out: Emitter,
    pub err: Emitter,
    pub timing: BufferTiming,
}

impl OutputPlan {
    /// Compile the task's template and encoding.
    ///
    /// Fails on a malformed template or an unknown encoding label; both are
    /// configuration defects.
    pub fn compile(task: &Task) -> Result<Self> {
        let normalizer = Normalizer::from_label(&task.encoding)?;
        let format = if task.format.is_empty() {
            None
        } else {
            Some(Arc::new(LineFormat::compile(&task.format, task)?))
        };

        Ok(Self {
            out: Emitter::new(task.out.clone(), format.clone(), normalizer),
            err: Emitter::new(task.err.clone(), format, normalizer),
            timing: BufferTiming::new(task.merge_threshold, task.flush_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::KeepaliveError;

    #[test]
    fn empty_format_suppresses_output() {
        let (sink, memory) = Sink::memory();
        let task = Task {
            out: Some(sink),
            ..Task::new("echo", ["hi"])
        };

        let plan = OutputPlan::compile(&task).unwrap();
        assert!(!plan.out.is_enabled());
        plan.out.emit_bytes(b"hi\n");
        assert!(memory.is_empty());
    }

    #[test]
    fn missing_sink_discards_output() {
        let task = Task {
            format: "%s\n".into(),
            ..Task::new("echo", ["hi"])
        };
        let plan = OutputPlan::compile(&task).unwrap();
        assert!(!plan.err.is_enabled());
        plan.err.emit_text("lost");
    }

    #[test]
    fn emitter_normalizes_then_formats() {
        let (sink, memory) = Sink::memory();
        let task = Task {
            name: "job".into(),
            format: "[{{name}}] %s\n".into(),
            err: Some(sink),
            ..Task::default()
        };
        let plan = OutputPlan::compile(&task).unwrap();

        plan.err.emit_bytes(b"line 1\r\nline 2\r\n");
        plan.err.emit_text("boom\n");
        assert_eq!(memory.emissions(), vec!["[job] line 1\r\nline 2\n", "[job] boom\n"]);
    }

    #[test]
    fn bad_template_fails_compilation() {
        let task = Task {
            format: "{{nope}}".into(),
            ..Task::default()
        };
        let err = OutputPlan::compile(&task).unwrap_err();
        assert!(matches!(err, KeepaliveError::Template(_)));
    }
}
