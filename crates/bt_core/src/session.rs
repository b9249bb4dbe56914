//! Per-user UI state and the transitions between interactions.
//!
//! A `Session` only changes through `Session::apply`. Menu events touch the
//! selected topic and nothing else; upload events touch the analysis and
//! nothing else.

use serde::{Deserialize, Serialize};

use crate::topics::InfoTopic;
use crate::types::Prediction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    Completed(Prediction),
    Failed { message: String },
}

/// The result panel for the most recent upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub file_name: String,
    /// `data:` URI of a downscaled preview, when the upload could be decoded.
    pub thumbnail: Option<String>,
    pub outcome: AnalysisOutcome,
}

impl Analysis {
    pub fn completed(file_name: impl Into<String>, thumbnail: Option<String>, prediction: Prediction) -> Self {
        Self {
            file_name: file_name.into(),
            thumbnail,
            outcome: AnalysisOutcome::Completed(prediction),
        }
    }

    pub fn failed(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            thumbnail: None,
            outcome: AnalysisOutcome::Failed { message: message.into() },
        }
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match &self.outcome {
            AnalysisOutcome::Completed(prediction) => Some(prediction),
            AnalysisOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Open a topic, or close it if it is already open.
    ToggleTopic(InfoTopic),
    CloseTopic,
    Analyzed(Analysis),
    ClearAnalysis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    selected_topic: Option<InfoTopic>,
    analysis: Option<Analysis>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_topic(&self) -> Option<InfoTopic> {
        self.selected_topic
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn apply(&mut self, event: Event) {
        match event {
            Event::ToggleTopic(topic) => {
                self.selected_topic = if self.selected_topic == Some(topic) {
                    None
                } else {
                    Some(topic)
                };
                tracing::debug!("topic now {:?}", self.selected_topic);
            }
            Event::CloseTopic => self.selected_topic = None,
            Event::Analyzed(analysis) => self.analysis = Some(analysis),
            Event::ClearAnalysis => self.analysis = None,
        }
    }
}
