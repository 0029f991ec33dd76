use std::path::PathBuf;

/// Result of converting a single file.
pub struct FileResult {
    pub path: PathBuf,
    /// Backend that produced the output
    pub converter: Option<String>,
    pub original_size: u64,
    pub converted_size: u64,
    pub error: Option<String>,
}

impl FileResult {
    pub fn failed(path: PathBuf, error: String) -> Self {
        Self {
            path,
            converter: None,
            original_size: 0,
            converted_size: 0,
            error: Some(error),
        }
    }

    pub fn savings_pct(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.converted_size as f64 / self.original_size as f64) * 100.0
    }
}

/// Aggregate report for all converted files.
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    fn succeeded(&self) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(|r| r.error.is_none())
    }

    pub fn total_original(&self) -> u64 {
        self.succeeded().map(|r| r.original_size).sum()
    }

    pub fn total_converted(&self) -> u64 {
        self.succeeded().map(|r| r.converted_size).sum()
    }

    pub fn total_savings_pct(&self) -> f64 {
        let orig = self.total_original();
        if orig == 0 {
            return 0.0;
        }
        (1.0 - self.total_converted() as f64 / orig as f64) * 100.0
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }

    /// Successful conversions per backend, most used first.
    pub fn converter_usage(&self) -> Vec<(String, usize)> {
        let mut usage: Vec<(String, usize)> = Vec::new();
        for name in self.succeeded().filter_map(|r| r.converter.as_deref()) {
            match usage.iter_mut().find(|(n, _)| n == name) {
                Some((_, count)) => *count += 1,
                None => usage.push((name.to_string(), 1)),
            }
        }
        usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        usage
    }

    pub fn print_summary(&self) {
        println!("\n--- Summary ---");
        println!(
            "Files converted: {} | Errors: {}",
            self.success_count(),
            self.error_count()
        );

        if self.success_count() > 0 {
            println!(
                "Total: {} → {} ({:.1}% reduction)",
                format_size(self.total_original()),
                format_size(self.total_converted()),
                self.total_savings_pct()
            );
            let usage: Vec<String> = self
                .converter_usage()
                .into_iter()
                .map(|(name, count)| format!("{name} ×{count}"))
                .collect();
            println!("Converters: {}", usage.join(", "));
        }

        for r in &self.results {
            if let Some(ref err) = r.error {
                println!("  ERROR {}: {}", r.path.display(), err);
            }
        }
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
