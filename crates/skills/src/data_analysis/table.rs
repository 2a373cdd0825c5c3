//! In-memory CSV table with per-column type inference and statistics.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use ai_agent_core::{Error, Result};

/// Cell spellings treated as missing.
const NULL_MARKERS: [&str; 8] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// Dtype label shown in reports.
    pub fn dtype(&self) -> &'static str {
        match self {
            Self::Integer => "int64",
            Self::Float => "float64",
            Self::Text => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    /// Raw cells, `None` for missing.
    pub values: Vec<Option<String>>,
    /// Parsed numbers; empty for text columns.
    pub numbers: Vec<Option<f64>>,
}

impl Column {
    fn infer(name: String, values: Vec<Option<String>>) -> Self {
        let present: Vec<&str> = values.iter().flatten().map(|s| s.as_str()).collect();
        let all_int = !present.is_empty() && present.iter().all(|v| v.parse::<i64>().is_ok());
        let all_float = !present.is_empty() && present.iter().all(|v| v.parse::<f64>().is_ok());

        let kind = if all_int {
            ColumnKind::Integer
        } else if all_float {
            ColumnKind::Float
        } else if present.is_empty() {
            // An all-missing column behaves like float NaNs.
            ColumnKind::Float
        } else {
            ColumnKind::Text
        };

        let (values, numbers) = if kind.is_numeric() {
            // "inf" and friends parse as f64 but are stored as missing.
            let numbers: Vec<Option<f64>> = values
                .iter()
                .map(|v| {
                    v.as_deref()
                        .and_then(|s| s.parse::<f64>().ok())
                        .filter(|n| n.is_finite())
                })
                .collect();
            let values = values
                .into_iter()
                .zip(&numbers)
                .map(|(v, n)| n.and(v))
                .collect();
            (values, numbers)
        } else {
            (values, Vec::new())
        };

        Self {
            name,
            kind,
            values,
            numbers,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    pub fn unique_count(&self) -> usize {
        if self.kind.is_numeric() {
            self.numbers
                .iter()
                .flatten()
                .map(|n| n.to_bits())
                .collect::<HashSet<_>>()
                .len()
        } else {
            self.values.iter().flatten().collect::<HashSet<_>>().len()
        }
    }

    /// Non-missing numeric values in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.numbers.iter().flatten().copied().collect()
    }

    /// Value frequencies, most frequent first; ties keep first-seen order.
    pub fn value_counts(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in self.values.iter().flatten() {
            let entry = counts.entry(value.clone()).or_insert_with(|| {
                order.push(value.clone());
                0
            });
            *entry += 1;
        }
        let mut out: Vec<(String, usize)> = order
            .into_iter()
            .map(|v| {
                let n = counts.get(&v).copied().unwrap_or(0);
                (v, n)
            })
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    pub fn stats(&self) -> Option<ColumnStats> {
        if !self.kind.is_numeric() {
            return None;
        }
        ColumnStats::compute(&self.numeric_values())
    }

    /// Cell rendered for display.
    pub fn display_value(&self, row: usize) -> String {
        match self.values.get(row).and_then(|v| v.as_ref()) {
            None => "NaN".to_string(),
            Some(raw) => match (self.kind, self.numbers.get(row).copied().flatten()) {
                (ColumnKind::Float, Some(n)) => format_number(n),
                _ => raw.clone(),
            },
        }
    }
}

/// Descriptive statistics of a numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = if sorted.len() > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            f64::NAN
        };

        Some(Self {
            count: sorted.len(),
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson correlation over rows where both values are present.
pub fn correlation(a: &Column, b: &Column) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .numbers
        .iter()
        .zip(b.numbers.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{:.6}", value)
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Loaded CSV data, column-major.
#[derive(Debug, Clone)]
pub struct DataTable {
    columns: Vec<Column>,
    rows: usize,
}

impl DataTable {
    /// Parse CSV with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| Error::invalid_request(format!("Error reading CSV file: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(Error::invalid_request("Error reading CSV file: no columns to parse"));
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut rows = 0;
        for record in rdr.records() {
            let record =
                record.map_err(|e| Error::invalid_request(format!("Error reading CSV file: {}", e)))?;
            for (i, column) in cells.iter_mut().enumerate() {
                let cell = record.get(i).map(str::trim).unwrap_or("");
                column.push(if NULL_MARKERS.contains(&cell) {
                    None
                } else {
                    Some(cell.to_string())
                });
            }
            rows += 1;
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .enumerate()
            .map(|(i, (name, values))| {
                let name = if name.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    name
                };
                Column::infer(name, values)
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.kind.is_numeric()).collect()
    }

    /// First `n` rows as an index-prefixed grid.
    pub fn head_grid(&self, n: usize) -> String {
        let mut headers = vec![String::new()];
        headers.extend(self.column_names());
        let rows: Vec<Vec<String>> = (0..self.rows.min(n))
            .map(|r| {
                let mut row = vec![r.to_string()];
                row.extend(self.columns.iter().map(|c| c.display_value(r)));
                row
            })
            .collect();
        render_grid(&headers, &rows)
    }

    /// Statistics grid (count, mean, std, min, quartiles, max) of numeric columns.
    pub fn describe_grid(&self) -> String {
        let numeric: Vec<(&Column, Option<ColumnStats>)> = self
            .numeric_columns()
            .into_iter()
            .map(|c| (c, c.stats()))
            .collect();
        if numeric.is_empty() {
            return "No numeric columns.".to_string();
        }

        let mut headers = vec![String::new()];
        headers.extend(numeric.iter().map(|(c, _)| c.name.clone()));

        let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
        let rows = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let mut row = vec![label.to_string()];
                row.extend(numeric.iter().map(|(_, stats)| match stats {
                    None if i == 0 => "0".to_string(),
                    None => "NaN".to_string(),
                    Some(s) => {
                        let v = [
                            s.count as f64, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max,
                        ][i];
                        format_number(v)
                    }
                }));
                row
            })
            .collect::<Vec<_>>();
        render_grid(&headers, &rows)
    }

    /// Plain-text dump of the first `n` rows for LLM context.
    pub fn head_text(&self, n: usize) -> String {
        let mut out = self.column_names().join(", ");
        for r in 0..self.rows.min(n) {
            out.push('\n');
            out.push_str(
                &self
                    .columns
                    .iter()
                    .map(|c| c.display_value(r))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        out
    }
}

/// Render rows as a `+---+` bordered text grid.
pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let border = |fill: char| {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&fill.to_string().repeat(w + 2));
            line.push('+');
        }
        line
    };
    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let pad = w - cell.chars().count();
            line.push_str(&format!(" {}{} |", cell, " ".repeat(pad)));
        }
        line
    };

    let mut out = vec![border('-'), render_row(headers), border('=')];
    for row in rows {
        out.push(render_row(row));
        out.push(border('-'));
    }
    if rows.is_empty() {
        out.push(border('-'));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> DataTable {
        DataTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_counts_and_inference() {
        let t = table("name,score\nann,1.5\nbob,2\ncat,\n");
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.column("name").unwrap().kind, ColumnKind::Text);

        let score = t.column("score").unwrap();
        assert_eq!(score.kind, ColumnKind::Float);
        assert_eq!(score.null_count(), 1);
        assert_eq!(score.numeric_values(), vec![1.5, 2.0]);
    }

    #[test]
    fn test_infinite_cells_are_missing() {
        let t = table("label,v\na,1\nb,inf\nc,-Infinity\nd,4\n");
        let v = t.column("v").unwrap();
        assert_eq!(v.kind, ColumnKind::Float);
        assert_eq!(v.null_count(), 2);
        assert_eq!(v.numeric_values(), vec![1.0, 4.0]);
        assert_eq!(v.display_value(1), "NaN");
        assert_eq!(v.stats().unwrap().max, 4.0);
    }

    #[test]
    fn test_stats_match_linear_quantiles() {
        let stats = ColumnStats::compute(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q25, 1.75);
        assert_eq!(stats.q75, 3.25);
        assert!((stats.std - 1.2909944).abs() < 1e-6);
    }

    #[test]
    fn test_value_counts_order() {
        let t = table("city\nHanoi\nHue\nHanoi\nDa Nang\nHue\nHanoi\n");
        let counts = t.column("city").unwrap().value_counts();
        assert_eq!(counts[0], ("Hanoi".to_string(), 3));
        assert_eq!(counts[1], ("Hue".to_string(), 2));
        assert_eq!(counts[2], ("Da Nang".to_string(), 1));
    }

    #[test]
    fn test_correlation() {
        let t = table("a,b,c\n1,2,3\n2,4,2\n3,6,1\n");
        let a = t.column("a").unwrap();
        assert!((correlation(a, t.column("b").unwrap()) - 1.0).abs() < 1e-9);
        assert!((correlation(a, t.column("c").unwrap()) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_rendering() {
        let t = table("x,y\n1,a\n22,b\n");
        let grid = t.head_grid(5);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines[0], "+---+----+---+");
        assert_eq!(lines[1], "|   | x  | y |");
        assert_eq!(lines[2], "+===+====+===+");
        assert_eq!(lines[3], "| 0 | 1  | a |");
    }
}
