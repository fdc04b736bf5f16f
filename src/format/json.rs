//! JSON output formatter

use crate::cache::Fetched;
use crate::demographics::DemographicsBundle;
use crate::error::Result;
use crate::format::{AnalysisReport, OutputFormatter};
use crate::scoring::{is_emphasized, OpportunityRanking};
use serde::Serialize;

/// JSON formatter - outputs full results as pretty-printed JSON
pub struct JsonFormatter;

/// A ranking with its view emphasis
#[derive(Serialize)]
struct RankingView<'a> {
    #[serde(flatten)]
    ranking: &'a OpportunityRanking,
    emphasized: bool,
}

impl OutputFormatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Full JSON output"
    }

    fn format_analysis(&self, report: &AnalysisReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }

    fn format_demographics(&self, bundle: &Fetched<DemographicsBundle>) -> Result<String> {
        Ok(serde_json::to_string_pretty(bundle)?)
    }

    fn format_rankings(&self, rankings: &[OpportunityRanking]) -> Result<String> {
        let views: Vec<RankingView> = rankings
            .iter()
            .map(|ranking| RankingView {
                ranking,
                emphasized: is_emphasized(ranking),
            })
            .collect();
        Ok(serde_json::to_string_pretty(&views)?)
    }
}
