use anyhow::Result;
use tpch_collect::RunSummary;

pub struct CliLogger {
    json: bool,
    no_color: bool,
}

impl CliLogger {
    pub fn new(json: bool, no_color: bool) -> Self {
        Self { json, no_color }
    }

    pub fn print_summary(&self, summary: &RunSummary) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(summary)?);
            return Ok(());
        }

        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            self.style("tpch-collect", "36;1"),
            self.style("OK", "32;1")
        ));
        out.push_str(&format!("{} {}\n", self.style("input", "90"), summary.input));
        out.push_str(&format!("{} {}\n", self.style("output", "90"), summary.output));
        out.push_str(&format!(
            "{} {}\n",
            self.style("phases", "90"),
            summary.phase_line()
        ));
        out.push_str(&format!(
            "{} {:.1}%\n",
            self.style("hit ratio", "90"),
            summary.hit_ratio
        ));
        out.push_str(&format!(
            "{} completed={} cancelled={} timeout={}s capped_total={:.2}s\n",
            self.style("queries", "90"),
            summary.completed.len(),
            summary.cancelled.len(),
            summary.query_timeout_secs,
            summary.capped_query_secs
        ));

        if let Some(cp) = &summary.checkpoints {
            out.push_str(&format!(
                "{} count={} timed={} requested={} buffers={} total={}s\n",
                self.style("checkpoints", "90"),
                cp.count,
                cp.timed,
                cp.requested,
                cp.buffers_written,
                cp.total_secs
            ));
        }

        if !summary.cancelled.is_empty() {
            let ids: Vec<String> = summary.cancelled.iter().map(|id| id.to_string()).collect();
            out.push_str(&format!(
                "{} {}\n",
                self.style("cancelled", "33;1"),
                ids.join(", ")
            ));
        }

        println!("{}", out.trim_end());
        Ok(())
    }

    pub fn print_error(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "error",
                "code": "error",
                "message": msg,
            });
            println!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("error", "31;1"));
    }

    pub fn print_warning(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "warning",
                "code": "warning",
                "message": msg,
            });
            eprintln!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("warn", "33;1"));
    }

    fn style(&self, text: &str, ansi: &str) -> String {
        if self.no_color {
            return text.to_string();
        }
        format!("\x1b[{ansi}m{text}\x1b[0m")
    }
}
