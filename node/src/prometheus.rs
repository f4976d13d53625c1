//! Minimal Prometheus text-format rendering.
//!
//! Response types that can sensibly be scraped implement [`ToMetrics`];
//! the API renders them through [`encode`] when a request carries
//! `?response=prometheus`.

/// One sample in the text exposition format.
pub struct Metric {
    pub name: &'static str,
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Metric {
    pub fn new(name: &'static str, value: f64) -> Metric {
        Metric {
            name,
            labels: Vec::new(),
            value,
        }
    }

    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Metric {
        self.labels.push((key, value.into()));
        self
    }
}

/// A response that can be rendered as Prometheus metrics.
pub trait ToMetrics {
    fn to_metrics(&self) -> Vec<Metric>;
}

/// Renders metrics in the Prometheus text exposition format.
pub fn encode(metrics: &[Metric]) -> String {
    let mut out = String::new();
    for metric in metrics {
        out.push_str(metric.name);
        if !metric.labels.is_empty() {
            out.push('{');
            for (i, (key, value)) in metric.labels.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(key);
                out.push_str("=\"");
                // label values here are ids and addresses; quotes and
                // backslashes cannot occur, newlines must not
                out.push_str(&value.replace('\n', " "));
                out.push('"');
            }
            out.push('}');
        }
        out.push(' ');
        out.push_str(&format_value(metric.value));
        out.push('\n');
    }
    out
}

fn format_value(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_labels_and_values() {
        let metrics = vec![
            Metric::new("utxod_consensus_tip_height", 42.0),
            Metric::new("utxod_wallet_balance_siacoins", 100.0).with_label("id", "0a"),
        ];
        let text = encode(&metrics);
        assert_eq!(
            text,
            "utxod_consensus_tip_height 42\nutxod_wallet_balance_siacoins{id=\"0a\"} 100\n"
        );
    }
}
