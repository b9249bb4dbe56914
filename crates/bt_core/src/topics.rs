use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Informational menu entries shown beside the upload panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoTopic {
    Overview,
    Symptoms,
    Types,
    Diagnosis,
    Treatment,
    Model,
}

impl InfoTopic {
    pub const ALL: [InfoTopic; 6] = [
        InfoTopic::Overview,
        InfoTopic::Symptoms,
        InfoTopic::Types,
        InfoTopic::Diagnosis,
        InfoTopic::Treatment,
        InfoTopic::Model,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            InfoTopic::Overview => "overview",
            InfoTopic::Symptoms => "symptoms",
            InfoTopic::Types => "types",
            InfoTopic::Diagnosis => "diagnosis",
            InfoTopic::Treatment => "treatment",
            InfoTopic::Model => "model",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            InfoTopic::Overview => "What is a Brain Tumor?",
            InfoTopic::Symptoms => "Common Symptoms",
            InfoTopic::Types => "Types of Brain Tumors",
            InfoTopic::Diagnosis => "How It Is Diagnosed",
            InfoTopic::Treatment => "Treatment Options",
            InfoTopic::Model => "About the Model",
        }
    }

    pub fn paragraphs(self) -> &'static [&'static str] {
        match self {
            InfoTopic::Overview => &[
                "A brain tumor is a mass or growth of abnormal cells in or around the brain. \
                 Tumors can be benign (non-cancerous) or malignant (cancerous), and they can \
                 start in the brain itself (primary) or spread there from elsewhere in the body \
                 (metastatic).",
                "Because the skull is rigid, any growth can raise pressure inside it and affect \
                 nearby brain tissue, which is why early detection matters.",
            ],
            InfoTopic::Symptoms => &[
                "Persistent headaches that are often worse in the morning.",
                "Seizures, nausea or vomiting, blurred or double vision.",
                "Changes in personality, memory, speech or balance, and weakness on one side \
                 of the body.",
            ],
            InfoTopic::Types => &[
                "Gliomas arise from the glial cells that support neurons and include \
                 astrocytomas and glioblastomas.",
                "Meningiomas grow from the membranes surrounding the brain and are usually \
                 benign.",
                "Pituitary tumors form in the pituitary gland and can disturb hormone levels.",
            ],
            InfoTopic::Diagnosis => &[
                "Magnetic resonance imaging (MRI) is the primary tool for finding brain tumors. \
                 CT scans, biopsies and neurological exams complete the picture.",
                "Automated screening such as this tool can flag scans for review but never \
                 replaces a radiologist or neurologist.",
            ],
            InfoTopic::Treatment => &[
                "Treatment depends on the tumor's type, size and location, and may combine \
                 surgery, radiation therapy, chemotherapy and targeted drug therapy.",
                "Regular follow-up imaging is used to monitor response and recurrence.",
            ],
            InfoTopic::Model => &[
                "Predictions come from a Vision Transformer (ViT-Base, 16×16 patches, 224×224 \
                 input) fine-tuned to separate MRI scans with and without a tumor.",
                "The model outputs two scores that are turned into probabilities with a \
                 softmax. The reported confidence is the probability of the predicted class. \
                 Results are for educational purposes only and are not a medical diagnosis.",
            ],
        }
    }
}

impl fmt::Display for InfoTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for InfoTopic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InfoTopic::ALL
            .into_iter()
            .find(|topic| topic.slug().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Session(format!("unknown topic: {}", s)))
    }
}
