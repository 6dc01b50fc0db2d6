use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    /// Index into `choices`.
    pub answer: usize,
}

impl QuizQuestion {
    pub fn new(prompt: &str, choices: &[&str], answer: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            answer,
        }
    }
}

/// What a lesson phase shows. Every phase kind is known when the module is
/// defined, so the presentation layer dispatches on the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseContent {
    Narrative {
        body: String,
    },
    Formula {
        expression: String,
        explanation: String,
    },
    ParameterExplorer {
        parameters: Vec<String>,
    },
    Chart {
        series: Vec<String>,
        caption: Option<String>,
    },
    Quiz {
        questions: Vec<QuizQuestion>,
    },
    Summary {
        points: Vec<String>,
    },
}

impl PhaseContent {
    pub fn kind(&self) -> &'static str {
        match self {
            PhaseContent::Narrative { .. } => "narrative",
            PhaseContent::Formula { .. } => "formula",
            PhaseContent::ParameterExplorer { .. } => "parameter_explorer",
            PhaseContent::Chart { .. } => "chart",
            PhaseContent::Quiz { .. } => "quiz",
            PhaseContent::Summary { .. } => "summary",
        }
    }

    pub fn is_renderable(&self) -> bool {
        match self {
            PhaseContent::Narrative { body } => !body.trim().is_empty(),
            PhaseContent::Formula { expression, .. } => !expression.trim().is_empty(),
            PhaseContent::ParameterExplorer { parameters } => !parameters.is_empty(),
            PhaseContent::Chart { series, .. } => !series.is_empty(),
            PhaseContent::Quiz { questions } => {
                !questions.is_empty()
                    && questions
                        .iter()
                        .all(|q| !q.prompt.trim().is_empty() && q.answer < q.choices.len())
            }
            PhaseContent::Summary { points } => !points.is_empty(),
        }
    }
}

/// One step of a lesson walkthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDescriptor {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: PhaseContent,
}

impl PhaseDescriptor {
    pub fn new(id: &str, title: &str, content: PhaseContent) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            content,
        }
    }

    pub fn narrative(id: &str, title: &str, body: &str) -> Self {
        Self::new(id, title, PhaseContent::Narrative { body: body.to_string() })
    }

    pub fn formula(id: &str, title: &str, expression: &str, explanation: &str) -> Self {
        Self::new(
            id,
            title,
            PhaseContent::Formula {
                expression: expression.to_string(),
                explanation: explanation.to_string(),
            },
        )
    }

    pub fn explorer(id: &str, title: &str, parameters: &[&str]) -> Self {
        Self::new(
            id,
            title,
            PhaseContent::ParameterExplorer {
                parameters: parameters.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn chart(id: &str, title: &str, series: &[&str], caption: Option<&str>) -> Self {
        Self::new(
            id,
            title,
            PhaseContent::Chart {
                series: series.iter().map(|s| s.to_string()).collect(),
                caption: caption.map(str::to_string),
            },
        )
    }

    pub fn quiz(id: &str, title: &str, questions: Vec<QuizQuestion>) -> Self {
        Self::new(id, title, PhaseContent::Quiz { questions })
    }

    pub fn summary(id: &str, title: &str, points: &[&str]) -> Self {
        Self::new(
            id,
            title,
            PhaseContent::Summary {
                points: points.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_is_not_renderable() {
        assert!(!PhaseContent::Narrative { body: "  ".into() }.is_renderable());
        assert!(!PhaseContent::Chart { series: vec![], caption: None }.is_renderable());
        assert!(PhaseDescriptor::chart("c", "Chart", &["price"], None).content.is_renderable());
    }

    #[test]
    fn test_quiz_answer_must_index_a_choice() {
        let quiz = PhaseContent::Quiz {
            questions: vec![QuizQuestion {
                prompt: "Which is larger?".into(),
                choices: vec!["VaR".into(), "ES".into()],
                answer: 2,
            }],
        };
        assert!(!quiz.is_renderable());
    }

    #[test]
    fn test_content_is_tagged_by_kind() {
        let phase = PhaseDescriptor::explorer("explore", "Explore", &["spot"]);
        let json = serde_json::to_value(&phase).unwrap();
        assert_eq!(json["content"]["kind"], "parameter_explorer");
        assert_eq!(phase.content.kind(), "parameter_explorer");
    }
}
