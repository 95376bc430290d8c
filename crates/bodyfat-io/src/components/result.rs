//! Analysis result card.

use bodyfat_bridge::AnalysisResult;
use dioxus::prelude::*;

/// Props for the [`AnalysisSummary`] component.
#[derive(Props, Clone, PartialEq)]
pub struct AnalysisSummaryProps {
    /// The completed analysis.
    result: AnalysisResult,
}

/// Shows the estimate and whatever detail the analysis returned.
///
/// Fields the tool omitted are left out rather than shown as blanks.
#[component]
pub fn AnalysisSummary(props: AnalysisSummaryProps) -> Element {
    let result = &props.result;
    let estimate = result
        .body_fat_percentage
        .map_or_else(|| "No estimate".to_owned(), |p| format!("{p:.1}%"));
    let confidence = result.confidence.map(|c| c.to_string());
    let quality = result.photo_quality.map(|q| q.to_string());
    let reasoning = result.reasoning.clone();
    let anonymized = result.faces_anonymized == Some(true);

    rsx! {
        section { class: "result",
            p { class: "muted small", "Estimated body fat" }
            p { class: "result-value", "{estimate}" }
            dl {
                if let Some(confidence) = confidence {
                    dt { "Confidence" }
                    dd { "{confidence}" }
                }
                if let Some(quality) = quality {
                    dt { "Photo quality" }
                    dd { "{quality}" }
                }
            }
            if let Some(reasoning) = reasoning {
                p { class: "reasoning", "{reasoning}" }
            }
            if anonymized {
                p { class: "muted small", "Faces were blurred before analysis." }
            }
            p { class: "muted small",
                "Visual estimates are approximate and not medical advice."
            }
        }
    }
}
