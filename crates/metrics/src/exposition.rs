//! Prometheus text exposition rendering

use std::collections::HashSet;
use std::fmt::Write;

/// One scrape page under construction
///
/// Emits a `# TYPE` header the first time each metric name appears, then one
/// sample line per call. Label values are escaped per the text format rules.
pub struct Exposition {
    buf: String,
    typed: HashSet<String>,
}

impl Exposition {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(4096),
            typed: HashSet::new(),
        }
    }

    /// Emit a counter sample
    pub fn counter(&mut self, name: &str, labels: &[(&str, &str)], value: u64) {
        self.type_header(name, "counter");
        self.sample_start(name, labels);
        let _ = writeln!(self.buf, " {value}");
    }

    /// Emit a gauge sample
    pub fn gauge(&mut self, name: &str, labels: &[(&str, &str)], value: f64) {
        self.type_header(name, "gauge");
        self.sample_start(name, labels);
        let _ = writeln!(self.buf, " {value}");
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    fn type_header(&mut self, name: &str, kind: &str) {
        if self.typed.insert(name.to_string()) {
            let _ = writeln!(self.buf, "# TYPE {name} {kind}");
        }
    }

    fn sample_start(&mut self, name: &str, labels: &[(&str, &str)]) {
        self.buf.push_str(name);
        if !labels.is_empty() {
            self.buf.push('{');
            for (i, (k, v)) in labels.iter().enumerate() {
                if i > 0 {
                    self.buf.push(',');
                }
                let _ = write!(self.buf, "{k}=\"");
                for c in v.chars() {
                    match c {
                        '\\' => self.buf.push_str("\\\\"),
                        '"' => self.buf.push_str("\\\""),
                        '\n' => self.buf.push_str("\\n"),
                        c => self.buf.push(c),
                    }
                }
                self.buf.push('"');
            }
            self.buf.push('}');
        }
    }
}

impl Default for Exposition {
    fn default() -> Self {
        Self::new()
    }
}
