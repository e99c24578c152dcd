//! Atomic counters and their text exposition.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter, described by a metric name and help
/// line for exporters.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    help: &'static str,
    value: AtomicU64,
}

impl Counter {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            value: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Append the counter in text exposition format, labelled with the
    /// owning group.
    pub fn render(&self, group: &str, out: &mut String) {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "# HELP {} {}", self.name, self.help);
        let _ = writeln!(out, "# TYPE {} counter", self.name);
        let _ = writeln!(
            out,
            "{}{{group=\"{}\"}} {}",
            self.name,
            escape_label(group),
            self.get()
        );
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("cache_gets_total", "Total get requests");
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc_by(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_render() {
        let counter = Counter::new("cache_gets_total", "Total get requests");
        counter.inc_by(3);

        let mut out = String::new();
        counter.render("scores", &mut out);
        assert_eq!(
            out,
            "# HELP cache_gets_total Total get requests\n\
             # TYPE cache_gets_total counter\n\
             cache_gets_total{group=\"scores\"} 3\n"
        );
    }

    #[test]
    fn test_render_escapes_group_label() {
        let counter = Counter::new("cache_gets_total", "Total get requests");

        let mut out = String::new();
        counter.render("a\"b\\c", &mut out);
        assert!(out.ends_with("cache_gets_total{group=\"a\\\"b\\\\c\"} 0\n"));
    }
}
