// src/provider/roles.rs — Role-based model assignment

/// Assigns a model id to each capability role of the engine. All three
/// roles go through the same provider; the ids let a deployment use a
/// cheaper model for classification than for synthesis.
#[derive(Debug, Clone)]
pub struct ModelRoles {
    pub classifier: String,
    pub synthesizer: String,
    pub assessor: String,
}

impl ModelRoles {
    /// Same model everywhere. The common case.
    pub fn from_single(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            classifier: model.clone(),
            synthesizer: model.clone(),
            assessor: model,
        }
    }

    /// Build from explicit config, filling gaps with the default model.
    pub fn from_config(
        default: &str,
        classifier: Option<&str>,
        synthesizer: Option<&str>,
        assessor: Option<&str>,
    ) -> Self {
        Self {
            classifier: classifier.unwrap_or(default).to_string(),
            synthesizer: synthesizer.unwrap_or(default).to_string(),
            assessor: assessor.unwrap_or(default).to_string(),
        }
    }
}
