//! Human-readable text output formatter

use crate::cache::{Fetched, Freshness};
use crate::coord::TradeArea;
use crate::demographics::DemographicsBundle;
use crate::error::Result;
use crate::format::{AnalysisReport, OutputFormatter};
use crate::scoring::{is_emphasized, OpportunityRanking};

/// Text formatter - outputs human-readable summary
pub struct TextFormatter;

fn freshness_label(freshness: &Freshness) -> String {
    match freshness {
        Freshness::Fresh => "fresh".to_string(),
        Freshness::Cached { age_ms, is_stale } => format!(
            "cached {}s ago{}",
            age_ms / 1000,
            if *is_stale { ", stale" } else { "" }
        ),
    }
}

fn metric_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{:.0}", v),
        Some(v) => format!("{:.1}", v),
        None => "n/a".to_string(),
    }
}

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        let result = &report.result;
        let mut output = String::new();

        // Header
        output.push_str(&format!("tradescope analysis ({})\n", result.id()));
        output.push_str(&format!(
            "Center: ({:.6}, {:.6})\n",
            result.center().latitude(),
            result.center().longitude()
        ));
        match result.trade_area() {
            TradeArea::Circle { radius_miles, .. } => {
                output.push_str(&format!("Trade area: {} mi radius\n", radius_miles));
            }
            TradeArea::Polygon { .. } => {
                output.push_str(&format!(
                    "Trade area: polygon (fetched within {:.3} mi)\n",
                    result.radius_miles()
                ));
            }
        }
        output.push_str(&format!(
            "POIs: {} in area, {} fetched\n",
            result.pois().len(),
            result.fetched_count()
        ));
        if let Some(visible) = &report.visible_pois {
            output.push_str(&format!("Showing: {} of {}\n", visible.len(), result.pois().len()));
        }
        output.push('\n');

        output.push_str("By category:\n");
        for (category, count) in result.summary_by_category().iter() {
            output.push_str(&format!("  {:<28}{:>5}\n", category.label(), count));
        }

        if !report.top_items.is_empty() {
            output.push_str("\nTop places:\n");
            for poi in &report.top_items {
                output.push_str(&format!("  {} [{}]", poi.name, poi.category));
                if let Some(address) = &poi.address {
                    output.push_str(&format!(" - {}", address));
                }
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn format_demographics(&self, bundle: &Fetched<DemographicsBundle>) -> Result<String> {
        let value = &bundle.value;
        let mut output = String::new();

        output.push_str(&format!(
            "Demographics around ({:.6}, {:.6}) [{}]\n",
            value.center.latitude(),
            value.center.longitude(),
            freshness_label(&bundle.freshness)
        ));

        for (radius, metrics) in &value.radii {
            output.push_str(&format!("\n{} mi:\n", radius));
            if metrics.is_empty() {
                output.push_str("  no coverage\n");
                continue;
            }
            for (name, metric) in metrics.fields() {
                output.push_str(&format!("  {:<30}{:>16}\n", name, metric_value(metric)));
            }
        }

        Ok(output)
    }

    fn format_rankings(&self, rankings: &[OpportunityRanking]) -> Result<String> {
        if rankings.is_empty() {
            return Ok("No candidates match the current filters.\n".to_string());
        }

        let mut output = String::new();
        for ranking in rankings {
            let marker = if is_emphasized(ranking) { "*" } else { " " };
            let property = &ranking.property;
            output.push_str(&format!(
                "{}{:>3}. {:<10} {:>5.1}  {} ({})\n",
                marker,
                ranking.rank,
                property.id,
                ranking.priority_score,
                property.address.as_deref().unwrap_or("no address"),
                property.property_type
            ));
            if !ranking.priority_signals.is_empty() {
                output.push_str(&format!(
                    "       {}\n",
                    ranking.priority_signals.join("; ")
                ));
            }
        }

        Ok(output)
    }
}
