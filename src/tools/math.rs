//! Arithmetic and statistics tools.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::handler::{
    get_f64_arg, get_f64_array_arg, get_string_arg, success_result, ToolHandler,
};
use crate::mcp::protocol::{Tool, ToolResult};

/// Addition tool.
pub struct AddTool;

impl AddTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for AddTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "add".to_string(),
            description: "Add two numbers".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "a": {"type": "number"},
                    "b": {"type": "number"}
                },
                "required": ["a", "b"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let a = get_f64_arg(&args, "a")?;
        let b = get_f64_arg(&args, "b")?;

        Ok(success_result((a + b).to_string()))
    }
}

/// Performance metrics calculator.
pub struct CalculateMetricsTool;

impl CalculateMetricsTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolHandler for CalculateMetricsTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "calculate-metrics".to_string(),
            description: "Calculate various performance metrics".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "values": {
                        "type": "array",
                        "items": {"type": "number"},
                        "description": "Array of numeric values"
                    },
                    "metricType": {
                        "type": "string",
                        "enum": ["mean", "median", "stddev", "percentile"],
                        "description": "Type of metric to calculate"
                    },
                    "percentile": {
                        "type": "number",
                        "description": "Percentile value (0-100) if metricType is percentile"
                    }
                },
                "required": ["values", "metricType"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let values = get_f64_array_arg(&args, "values")?;
        let metric_type = get_string_arg(&args, "metricType")?;

        let result = match metric_type.as_str() {
            "mean" => mean(&values),
            "median" => median(&values),
            "stddev" => stddev(&values),
            "percentile" => {
                let p = get_f64_arg(&args, "percentile").map_err(|_| {
                    Error::InvalidToolArguments("Percentile value required".to_string())
                })?;
                percentile(&values, p)
            }
            other => {
                return Err(Error::InvalidToolArguments(format!(
                    "Unknown metric type: {}",
                    other
                )))
            }
        };

        Ok(success_result(format!(
            "{}: {:.4}",
            metric_type.to_uppercase(),
            result
        )))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population standard deviation.
fn stddev(values: &[f64]) -> f64 {
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Nearest-rank percentile over the sorted values.
fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    // Out-of-range percentiles clamp to the extremes.
    let position = (index.round() as usize).min(sorted.len() - 1);
    sorted[position]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::ContentBlock;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn text_of(result: &ToolResult) -> &str {
        match &result.content[0] {
            ContentBlock::Text { text } => text,
            _ => panic!("expected text content"),
        }
    }

    #[tokio::test]
    async fn test_add() {
        let tool = AddTool::new();

        let result = tool
            .execute(args(&[("a", json!(2)), ("b", json!(3))]))
            .await
            .unwrap();

        assert_eq!(text_of(&result), "5");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_add_fractional() {
        let tool = AddTool::new();

        let result = tool
            .execute(args(&[("a", json!(1.25)), ("b", json!(1.25))]))
            .await
            .unwrap();

        assert_eq!(text_of(&result), "2.5");
    }

    #[tokio::test]
    async fn test_add_missing_argument() {
        let tool = AddTool::new();

        let err = tool.execute(args(&[("a", json!(2))])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidToolArguments(_)));
    }

    #[tokio::test]
    async fn test_mean() {
        let tool = CalculateMetricsTool::new();

        let result = tool
            .execute(args(&[
                ("values", json!([1, 2, 3, 4])),
                ("metricType", json!("mean")),
            ]))
            .await
            .unwrap();

        assert_eq!(text_of(&result), "MEAN: 2.5000");
    }

    #[tokio::test]
    async fn test_median_even_and_odd() {
        let tool = CalculateMetricsTool::new();

        let even = tool
            .execute(args(&[
                ("values", json!([4, 1, 3, 2])),
                ("metricType", json!("median")),
            ]))
            .await
            .unwrap();
        assert_eq!(text_of(&even), "MEDIAN: 2.5000");

        let odd = tool
            .execute(args(&[
                ("values", json!([3, 1, 2])),
                ("metricType", json!("median")),
            ]))
            .await
            .unwrap();
        assert_eq!(text_of(&odd), "MEDIAN: 2.0000");
    }

    #[tokio::test]
    async fn test_stddev() {
        let tool = CalculateMetricsTool::new();

        let result = tool
            .execute(args(&[
                ("values", json!([2, 4, 4, 4, 5, 5, 7, 9])),
                ("metricType", json!("stddev")),
            ]))
            .await
            .unwrap();

        assert_eq!(text_of(&result), "STDDEV: 2.0000");
    }

    #[tokio::test]
    async fn test_percentile() {
        let tool = CalculateMetricsTool::new();

        let median = tool
            .execute(args(&[
                ("values", json!([1, 2, 3, 4, 5])),
                ("metricType", json!("percentile")),
                ("percentile", json!(50)),
            ]))
            .await
            .unwrap();
        assert_eq!(text_of(&median), "PERCENTILE: 3.0000");

        let p90 = tool
            .execute(args(&[
                ("values", json!([1, 2, 3, 4, 5])),
                ("metricType", json!("percentile")),
                ("percentile", json!(90)),
            ]))
            .await
            .unwrap();
        assert_eq!(text_of(&p90), "PERCENTILE: 5.0000");
    }

    #[tokio::test]
    async fn test_percentile_requires_value() {
        let tool = CalculateMetricsTool::new();

        let err = tool
            .execute(args(&[
                ("values", json!([1, 2, 3])),
                ("metricType", json!("percentile")),
            ]))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::InvalidToolArguments(ref msg) if msg == "Percentile value required")
        );
    }

    #[tokio::test]
    async fn test_unknown_metric_type() {
        let tool = CalculateMetricsTool::new();

        let err = tool
            .execute(args(&[
                ("values", json!([1, 2, 3])),
                ("metricType", json!("mode")),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidToolArguments(_)));
    }

    #[tokio::test]
    async fn test_empty_values_rejected() {
        let tool = CalculateMetricsTool::new();

        let err = tool
            .execute(args(&[
                ("values", json!([])),
                ("metricType", json!("mean")),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidToolArguments(_)));
    }
}
