use chrono::{DateTime, Utc};
use indicatif::{HumanCount, HumanDuration};
use std::fs::{self, OpenOptions};
use std::time::{Duration, Instant, SystemTime};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Default, Clone)]
pub struct StatsTimer {
    start_time: Option<Instant>,
    finish_time: Option<Instant>,
    duration: Duration,
}

impl StatsTimer {
    pub fn start() -> Self {
        Self {
            start_time: Some(Instant::now()),
            finish_time: None,
            duration: Duration::new(0, 0),
        }
    }

    pub fn finish(&mut self) {
        let now = Instant::now();
        self.finish_time = Some(now);
        if let Some(start) = self.start_time {
            self.duration = now.duration_since(start);
        }
    }

    pub fn get_duration(&self) -> Duration {
        self.duration
    }

    fn duration_string(&self) -> String {
        let total_seconds = self.duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        let millis = self.duration.subsec_millis();
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

/// Counters and timers for one indexing run.
#[derive(Debug, Default, Clone)]
pub struct IndexStats {
    /// The time the run started.
    pub run_start_time: Option<SystemTime>,
    pub discover_timer: StatsTimer,
    pub queue_timer: StatsTimer,
    pub process_timer: StatsTimer,

    /// Root directory that was scanned.
    pub root_path: String,
    /// Files matching the input specification.
    pub discovered_count: usize,
    /// Files committed to the store.
    pub processed_count: usize,
    /// Files whose signature came up empty.
    pub rejected_count: usize,
    /// Distinct signatures observed.
    pub distinct_fingerprint_count: usize,
}

#[derive(Debug, Clone, Tabled)]
pub struct IndexStatsPrintItem {
    #[tabled(skip)]
    pub name: String,
    #[tabled(rename = "Stat")]
    pub human_name: String,
    #[tabled(rename = "Value")]
    pub human_value: String,
    #[tabled(skip)]
    pub raw_string_value: String,
}

impl IndexStatsPrintItem {
    fn new(name: &str, human_value: String, raw_string_value: String) -> Self {
        let human_name = name
            .split('_')
            .map(|s| {
                let mut chars = s.chars();
                match chars.next() {
                    None => String::new(),
                    Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ");

        Self {
            name: name.to_string(),
            human_name,
            human_value,
            raw_string_value,
        }
    }

    fn count(name: &str, count: usize) -> Self {
        Self::new(name, HumanCount(count as u64).to_string(), count.to_string())
    }

    fn timer(name: &str, timer: &StatsTimer) -> Self {
        Self::new(
            name,
            HumanDuration(timer.get_duration()).to_string(),
            timer.duration_string(),
        )
    }
}

impl IndexStats {
    pub fn print(&self) {
        let table = Table::new(self.to_print_items())
            .with(Style::psql())
            .to_string();
        println!("{}", table);
    }

    pub fn to_print_items(&self) -> Vec<IndexStatsPrintItem> {
        let run_start = match self.run_start_time {
            Some(time) => {
                let datetime = DateTime::<Utc>::from(time);
                datetime.format("%Y-%m-%d %H:%M:%S").to_string()
            }
            None => String::new(),
        };

        vec![
            IndexStatsPrintItem::new("run_start_time", run_start.clone(), run_start),
            IndexStatsPrintItem::new("root_path", self.root_path.clone(), self.root_path.clone()),
            IndexStatsPrintItem::timer("discover_duration", &self.discover_timer),
            IndexStatsPrintItem::timer("queue_duration", &self.queue_timer),
            IndexStatsPrintItem::timer("process_duration", &self.process_timer),
            IndexStatsPrintItem::count("discovered_count", self.discovered_count),
            IndexStatsPrintItem::count("processed_count", self.processed_count),
            IndexStatsPrintItem::count("rejected_count", self.rejected_count),
            IndexStatsPrintItem::count(
                "distinct_fingerprint_count",
                self.distinct_fingerprint_count,
            ),
        ]
    }

    /// Append one row per run; headers are written when the file is new.
    pub fn write_csv(&self, filename: &str) -> std::io::Result<()> {
        let file_exists = fs::metadata(filename).is_ok();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(filename)?;
        let mut wtr = csv::Writer::from_writer(file);

        let items = self.to_print_items();

        if !file_exists {
            let headers: Vec<&String> = items.iter().map(|item| &item.name).collect();
            wtr.write_record(&headers)?;
        }

        let values: Vec<&String> = items.iter().map(|item| &item.raw_string_value).collect();
        wtr.write_record(&values)?;

        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_csv_appends_rows_with_single_header() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("stats.csv");
        let csv_path = csv_path.to_str().unwrap();

        let stats = IndexStats {
            run_start_time: Some(SystemTime::now()),
            discovered_count: 10,
            processed_count: 8,
            rejected_count: 2,
            distinct_fingerprint_count: 3,
            ..Default::default()
        };
        stats.write_csv(csv_path).unwrap();
        stats.write_csv(csv_path).unwrap();

        let contents = fs::read_to_string(csv_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("run_start_time,"));
        assert!(lines[1].contains(",10,8,2,3"));
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn test_print_items_humanize_names() {
        let stats = IndexStats::default();
        let items = stats.to_print_items();
        let processed = items
            .iter()
            .find(|item| item.name == "processed_count")
            .unwrap();
        assert_eq!(processed.human_name, "Processed Count");
    }
}
